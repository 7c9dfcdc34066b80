//! Neptune Host - Native host for the Neptune controller.
//!
//! Runs the controller in-process and exposes its bus over stdin/stdout:
//! one JSON `Envelope` per input line, one `OutboundFrame` per output line.
//! Change notifications are written as they happen.

#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use neptune_bus::{
    BusError, BusResponse, Envelope, MessageBus, OutboundFrame, dispatch, notifications,
};
use neptune_controller::{ControllerConfig, JsonFileStore, NeptuneController};
use neptune_gateway::ForkServerClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Neptune host starting");

    let config = ControllerConfig::from_env()?;
    let bus = Arc::new(MessageBus::with_config(config.bus.clone()));
    let gateway = Arc::new(
        ForkServerClient::builder()
            .with_timeout(config.request_timeout())
            .build()?,
    );
    let store = Arc::new(JsonFileStore::new(config.store_path.clone()));
    info!(store = %store.path().display(), base_url = %config.base_url, "configuration loaded");

    let controller = NeptuneController::new(config, bus.clone(), gateway, store);
    controller.register_handlers();

    let (out_tx, out_rx) = mpsc::channel::<OutboundFrame>(256);
    let writer = tokio::spawn(write_frames(out_rx));
    forward_notifications(&bus, out_tx.clone());

    match controller.init().await {
        Ok(outcome) => info!(?outcome, "controller initialized"),
        Err(err) => warn!(error = %err, "initial sync failed"),
    }

    serve(&bus, &out_tx).await?;

    info!("stdin closed, shutting down");
    drop(out_tx);
    drop(controller);
    drop(bus);
    writer.await??;
    Ok(())
}

/// Answer every request read from stdin, in arrival order.
async fn serve(bus: &MessageBus, out_tx: &mpsc::Sender<OutboundFrame>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let frame = match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => OutboundFrame::Reply {
                id: envelope.id,
                response: dispatch(bus, envelope.request).await,
            },
            Err(err) => {
                let id = Envelope::id_of(&line);
                warn!(error = %err, ?id, "malformed request");
                OutboundFrame::Reply {
                    id,
                    response: BusResponse::Error {
                        error: BusError::from(err).to_response(),
                    },
                }
            }
        };

        if out_tx.send(frame).await.is_err() {
            break;
        }
    }
    Ok(())
}

fn forward_notifications(bus: &MessageBus, out_tx: mpsc::Sender<OutboundFrame>) {
    let mut rx = notifications(bus);
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            if out_tx
                .send(OutboundFrame::Notification { notification })
                .await
                .is_err()
            {
                break;
            }
        }
    });
}

async fn write_frames(mut rx: mpsc::Receiver<OutboundFrame>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(frame) = rx.recv().await {
        let mut line = serde_json::to_vec(&frame)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
