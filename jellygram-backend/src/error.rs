//! Error taxonomy shared by the upstream clients, the account lifecycle
//! operations, and the ledger.

use thiserror::Error;

/// Which upstream service an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Jellyfin,
    Jellyseerr,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Jellyfin => write!(f, "Jellyfin"),
            Service::Jellyseerr => write!(f, "Jellyseerr"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The target identity already exists upstream; nothing was mutated.
    #[error("user '{username}' already exists on Jellyfin (id: {existing_id})")]
    Conflict {
        username: String,
        existing_id: String,
    },

    /// A lookup yielded nothing.
    #[error("{0}")]
    NotFound(String),

    /// 4xx/5xx from an upstream service, with status and body for the operator.
    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamHttp {
        service: Service,
        status: u16,
        body: String,
    },

    /// Timeout or connection failure talking to an upstream service.
    #[error("{service} network error: {message}")]
    UpstreamNetwork { service: Service, message: String },

    /// Ledger read/write failure.
    #[error("database error: {0}")]
    Persistence(String),

    /// Best-effort delivery failure; never escalated by callers.
    #[error("could not notify user {chat_user_id}: {message}")]
    Notification {
        chat_user_id: String,
        message: String,
    },
}

impl Error {
    /// Map a failed `reqwest` call to the taxonomy. Anything that produced a
    /// response becomes `UpstreamHttp`; everything else (timeouts, DNS,
    /// connect failures) is `UpstreamNetwork`.
    pub fn upstream(service: Service, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::UpstreamHttp {
                service,
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => Error::UpstreamNetwork {
                service,
                message: err.to_string(),
            },
        }
    }

    /// Build an `UpstreamHttp` from an already-read status and body.
    pub fn upstream_status(service: Service, status: u16, body: String) -> Self {
        Error::UpstreamHttp {
            service,
            status,
            body,
        }
    }

    /// True for a 404 from the given service. The deprovisioner uses this to
    /// treat "already absent" as the target state.
    pub fn is_not_found_from(&self, svc: Service) -> bool {
        matches!(
            self,
            Error::UpstreamHttp { service, status: 404, .. } if *service == svc
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let e = Error::upstream_status(Service::Jellyseerr, 404, "not found".to_string());
        assert!(e.is_not_found_from(Service::Jellyseerr));
        assert!(!e.is_not_found_from(Service::Jellyfin));

        let e = Error::upstream_status(Service::Jellyseerr, 500, "boom".to_string());
        assert!(!e.is_not_found_from(Service::Jellyseerr));
    }

    #[test]
    fn test_display_carries_status_and_body() {
        let e = Error::upstream_status(Service::Jellyfin, 400, "bad name".to_string());
        let text = e.to_string();
        assert!(text.contains("Jellyfin"));
        assert!(text.contains("400"));
        assert!(text.contains("bad name"));
    }
}
