//! Typed HTTP clients for the two upstream services.
//!
//! Both clients share one `reqwest::Client` (one pool) and authenticate via
//! their service-specific static header, added per-request.

pub mod jellyfin;
pub mod jellyseerr;

pub use jellyfin::{JellyfinClient, MediaServerApi};
pub use jellyseerr::{JellyseerrClient, RequestServiceApi};

use crate::error::{Error, Service};

/// Turn a non-2xx response into `UpstreamHttp`, keeping status and body for
/// the operator-facing message.
pub(crate) async fn check_status(
    service: Service,
    resp: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(Error::upstream_status(service, status.as_u16(), body))
    }
}
