use reqwest::Client;
use std::time::Duration;

/// Per-call timeout for both upstream services.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the HTTP client shared by both upstream clients.
///
/// Built once in `main` and cloned into each client — `Client::clone()` is
/// just an `Arc` increment, so both services share one connection pool.
/// Auth headers are added per-request by the typed clients.
pub fn build_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}
