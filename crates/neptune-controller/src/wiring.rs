//! Bus handler registration.

use std::future::{Ready, ready};
use std::sync::{Arc, Weak};

use neptune_bus::channels::{
    Accounts, ActiveFork, BaseUrl, Chain, Connection, ForkRpcUrl, ProviderRpcUrl, Rpc,
};
use neptune_bus::{BusError, BusResult, ChannelName};
use tracing::debug;

use crate::controller::NeptuneController;

fn upgrade(
    controller: &Weak<NeptuneController>,
    channel: ChannelName,
) -> BusResult<Arc<NeptuneController>> {
    controller
        .upgrade()
        .ok_or(BusError::ChannelUnavailable { channel })
}

/// Run a synchronous handler body against the controller, if it is alive.
fn answer<T>(
    controller: &Weak<NeptuneController>,
    channel: ChannelName,
    body: impl FnOnce(&NeptuneController) -> BusResult<T>,
) -> Ready<BusResult<T>> {
    ready(upgrade(controller, channel).and_then(|controller| body(&controller)))
}

impl NeptuneController {
    /// Serve every bus channel from this controller.
    ///
    /// Handlers hold a weak reference; once the controller is dropped they
    /// answer [`BusError::ChannelUnavailable`].
    pub fn register_handlers(self: &Arc<Self>) {
        let bus = self.bus().clone();
        let weak = Arc::downgrade(self);

        // get
        let w = weak.clone();
        bus.on_get::<Accounts, _, _>(move |()| answer(&w, ChannelName::Accounts, |c| Ok(c.accounts())));
        let w = weak.clone();
        bus.on_get::<Chain, _, _>(move |()| answer(&w, ChannelName::Chain, |c| Ok(c.chain_id())));
        let w = weak.clone();
        bus.on_get::<BaseUrl, _, _>(move |()| {
            answer(&w, ChannelName::BaseUrl, |c| Ok(c.base_url().to_string()))
        });
        let w = weak.clone();
        bus.on_get::<ProviderRpcUrl, _, _>(move |()| {
            answer(&w, ChannelName::ProviderRpcUrl, |c| Ok(c.provider_rpc_url()))
        });
        let w = weak.clone();
        bus.on_get::<ActiveFork, _, _>(move |()| answer(&w, ChannelName::Fork, |c| Ok(c.fork())));
        let w = weak.clone();
        bus.on_get::<ForkRpcUrl, _, _>(move |()| {
            answer(&w, ChannelName::ForkRpcUrl, |c| Ok(c.fork_rpc_url()))
        });
        let w = weak.clone();
        bus.on_get::<Connection, _, _>(move |tab| {
            answer(&w, ChannelName::Connection, |c| Ok(c.is_connected(tab)))
        });

        // set
        let w = weak.clone();
        bus.on_set::<Chain, _, _>(move |chain_id| {
            answer(&w, ChannelName::Chain, |c| {
                c.set_chain_id(chain_id);
                Ok(())
            })
        });
        let w = weak.clone();
        bus.on_set::<Accounts, _, _>(move |accounts| {
            answer(&w, ChannelName::Accounts, |c| {
                drop(c.set_accounts(accounts));
                Ok(())
            })
        });
        let w = weak.clone();
        bus.on_set::<ActiveFork, _, _>(move |fork| {
            answer(&w, ChannelName::Fork, |c| {
                drop(c.set_fork(fork));
                Ok(())
            })
        });
        let w = weak.clone();
        bus.on_set::<BaseUrl, _, _>(move |url: String| {
            answer(&w, ChannelName::BaseUrl, |c| {
                c.set_base_url(&url)
                    .map(drop)
                    .map_err(|err| err.into_bus_error(ChannelName::BaseUrl))
            })
        });
        let w = weak.clone();
        bus.on_set::<ProviderRpcUrl, _, _>(move |url: Option<String>| {
            answer(&w, ChannelName::ProviderRpcUrl, |c| {
                c.set_provider_rpc_url(url.as_deref())
                    .map_err(|err| err.into_bus_error(ChannelName::ProviderRpcUrl))
            })
        });
        let w = weak.clone();
        bus.on_set::<Connection, _, _>(move |change| {
            answer(&w, ChannelName::Connection, |c| {
                if change.connected {
                    c.connect(change.tab_id);
                } else {
                    c.disconnect(change.tab_id);
                }
                Ok(())
            })
        });

        // request
        let w = weak.clone();
        bus.on_request::<Rpc, _, _>(move |payload| {
            let w = w.clone();
            async move {
                let controller = upgrade(&w, ChannelName::Rpc)?;
                controller
                    .send_rpc_request(payload)
                    .await
                    .map_err(|err| err.into_bus_error(ChannelName::Rpc))
            }
        });
        bus.on_sync(move || {
            let w = weak.clone();
            async move {
                let controller = upgrade(&w, ChannelName::Sync)?;
                let outcome = controller
                    .sync()
                    .await
                    .map_err(|err| err.into_bus_error(ChannelName::Sync))?;
                debug!(?outcome, "sync requested over the bus");
                Ok(())
            }
        });
    }
}
