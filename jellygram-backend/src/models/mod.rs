//! Domain types shared across the account lifecycle and the command layer.

use chrono::{DateTime, Utc};

/// Durable record of one managed identity: a Telegram user mapped to its
/// Jellyfin and Jellyseerr accounts, plus lease metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedAccount {
    /// Telegram user id, stored as text. One record per chat identity.
    pub chat_user_id: String,
    /// Jellyseerr user id. Optional: a row written before the request-service
    /// import was confirmed may lack it.
    pub request_user_id: Option<String>,
    /// Jellyfin user id. Always set by the provisioner and the link flow.
    pub media_user_id: Option<String>,
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
    /// None means the account is permanent.
    pub expires_at: Option<DateTime<Utc>>,
    pub guild_id: Option<String>,
    /// Advisory label ("Trial", "VIP"); not enforced by either upstream.
    pub role_name: Option<String>,
}

impl LinkedAccount {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

/// Ephemeral input to the provisioning saga. Not persisted.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub chat_user_id: String,
    /// Raw display name as seen on Telegram; sanitized before account creation.
    pub display_name: String,
    pub duration_days: Option<i64>,
    pub role_name: Option<String>,
}

/// Transient pairing of the two upstream identities, produced by the resolver
/// during lookup/reconciliation. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamIdentity {
    pub username: String,
    pub media_user_id: String,
    /// Absent until the Jellyseerr counterpart has been confirmed.
    pub request_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(expires_at: Option<DateTime<Utc>>) -> LinkedAccount {
        LinkedAccount {
            chat_user_id: "1".to_string(),
            request_user_id: None,
            media_user_id: None,
            username: "alice".to_string(),
            created_at: None,
            expires_at,
            guild_id: None,
            role_name: None,
        }
    }

    #[test]
    fn test_permanent_account_never_expires() {
        assert!(!account(None).is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_comparison() {
        let now = Utc::now();
        assert!(account(Some(now - Duration::hours(1))).is_expired(now));
        assert!(account(Some(now)).is_expired(now));
        assert!(!account(Some(now + Duration::hours(1))).is_expired(now));
    }
}
