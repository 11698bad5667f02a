//! Shared HTTP client for the provider adapters.

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Covers the slowest expected call: answer synthesis over a multi-chunk
/// context. Embedding requests finish far sooner but share the client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client used by every provider adapter: rustls TLS, shared timeouts, and a
/// `mnema/{version}` user agent.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("mnema/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}
