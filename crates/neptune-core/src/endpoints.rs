//! Fork server endpoint derivation.
//!
//! Every function here is pure: the same base URL and fork always produce the
//! same endpoint.

use url::Url;

use crate::Fork;

/// Path segment under which the fork server exposes forks.
const FORKS_SEGMENT: &str = "forks";

/// The fork collection endpoint (`{base}/forks`).
#[must_use]
pub fn forks_url(base: &Url) -> Url {
    with_segments(base, &[FORKS_SEGMENT])
}

/// The endpoint of one fork (`{base}/forks/{id}`).
#[must_use]
pub fn fork_url(base: &Url, fork: &Fork) -> Url {
    with_segments(base, &[FORKS_SEGMENT, fork.id.as_str()])
}

/// The JSON-RPC endpoint of a fork.
#[must_use]
pub fn fork_rpc_url(base: &Url, fork: &Fork) -> Url {
    fork_url(base, fork)
}

/// Origin of the base URL, as sent in `Access-Control-Allow-Origin`.
#[must_use]
pub fn origin(base: &Url) -> String {
    base.origin().ascii_serialization()
}

fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
