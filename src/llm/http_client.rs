use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for the model endpoint. No overall request timeout:
/// a streamed response legitimately stays open for as long as generation
/// runs; only connection setup is bounded.
pub fn build_endpoint_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}
