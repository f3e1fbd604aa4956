//! Cross-service identity lookup and reconciliation.
//!
//! Jellyfin and Jellyseerr identities are never linked automatically from the
//! bot's point of view: the resolver finds a Jellyfin user by name and walks
//! Jellyseerr's user directory to find the row carrying that Jellyfin id.
//! All operations are read-only and idempotent.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::integrations::{MediaServerApi, RequestServiceApi};
use crate::models::UpstreamIdentity;

/// Jellyseerr can lag behind a just-created Jellyfin account. Callers wait
/// this long before reconciling right after a creation.
pub const RECONCILE_DELAY: Duration = Duration::from_secs(2);

/// Jellyseerr's user listing is paged; one page this large covers the whole
/// directory for any realistic install.
const USER_DIRECTORY_PAGE_SIZE: u32 = 1000;

pub struct IdentityResolver {
    media: Arc<dyn MediaServerApi>,
    requests: Arc<dyn RequestServiceApi>,
}

impl IdentityResolver {
    pub fn new(media: Arc<dyn MediaServerApi>, requests: Arc<dyn RequestServiceApi>) -> Self {
        Self { media, requests }
    }

    /// Find a Jellyfin account by username, case-insensitively, by scanning
    /// the server's full user list. The request-service id is left unresolved.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UpstreamIdentity>, Error> {
        let needle = username.to_lowercase();
        let users = self.media.list_users().await?;
        Ok(users
            .into_iter()
            .find(|u| u.name.to_lowercase() == needle)
            .map(|u| UpstreamIdentity {
                username: u.name,
                media_user_id: u.id,
                request_user_id: None,
            }))
    }

    /// Find the Jellyseerr user carrying the given Jellyfin id by walking the
    /// request service's user directory.
    pub async fn reconcile(
        &self,
        media_user_id: &str,
    ) -> Result<Option<UpstreamIdentity>, Error> {
        let users = self.requests.list_users(USER_DIRECTORY_PAGE_SIZE).await?;
        Ok(users
            .into_iter()
            .find(|u| u.matches_media_user(media_user_id))
            .map(|u| UpstreamIdentity {
                username: u.username.or(u.display_name).unwrap_or_default(),
                media_user_id: media_user_id.to_string(),
                request_user_id: Some(u.id.to_string()),
            }))
    }

    /// Full lookup for a deletion request that has no ledger row: find the
    /// Jellyfin account by name, then its Jellyseerr counterpart. A missing
    /// counterpart is not an error; the identity comes back without it.
    pub async fn resolve_username(
        &self,
        username: &str,
    ) -> Result<Option<UpstreamIdentity>, Error> {
        let Some(identity) = self.find_by_username(username).await? else {
            return Ok(None);
        };
        match self.reconcile(&identity.media_user_id).await? {
            Some(full) => Ok(Some(UpstreamIdentity {
                username: identity.username,
                ..full
            })),
            None => {
                log::warn!(
                    "[RESOLVE] User {} exists on Jellyfin but not on Jellyseerr",
                    identity.media_user_id
                );
                Ok(Some(identity))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::testing::{MockMediaServer, MockRequestService};

    fn resolver(
        media: MockMediaServer,
        requests: MockRequestService,
    ) -> IdentityResolver {
        IdentityResolver::new(Arc::new(media), Arc::new(requests))
    }

    #[tokio::test]
    async fn test_find_by_username_is_case_insensitive() {
        let media = MockMediaServer::with_users(&[("jf-1", "Alice")]);
        let r = resolver(media, MockRequestService::default());

        let found = r.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.media_user_id, "jf-1");
        assert_eq!(found.username, "Alice");
        assert!(found.request_user_id.is_none());

        assert!(r.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reconcile_matches_by_media_id() {
        let requests = MockRequestService::with_users(&[(7, "alice", Some("jf-1"))]);
        let r = resolver(MockMediaServer::default(), requests);

        let identity = r.reconcile("jf-1").await.unwrap().unwrap();
        assert_eq!(identity.request_user_id.as_deref(), Some("7"));
        assert_eq!(identity.username, "alice");

        assert!(r.reconcile("jf-other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_username_chains_both_directories() {
        let media = MockMediaServer::with_users(&[("jf-1", "Alice")]);
        let requests = MockRequestService::with_users(&[(7, "alice", Some("jf-1"))]);
        let r = resolver(media, requests);

        let identity = r.resolve_username("ALICE").await.unwrap().unwrap();
        assert_eq!(identity.media_user_id, "jf-1");
        assert_eq!(identity.request_user_id.as_deref(), Some("7"));
        // The media-server spelling wins for display purposes.
        assert_eq!(identity.username, "Alice");
    }

    #[tokio::test]
    async fn test_resolve_username_tolerates_missing_counterpart() {
        let media = MockMediaServer::with_users(&[("jf-1", "Alice")]);
        let r = resolver(media, MockRequestService::default());

        let identity = r.resolve_username("alice").await.unwrap().unwrap();
        assert_eq!(identity.media_user_id, "jf-1");
        assert!(identity.request_user_id.is_none());
    }

    #[tokio::test]
    async fn test_resolver_is_read_only() {
        let media = Arc::new(MockMediaServer::with_users(&[("jf-1", "Alice")]));
        let requests = Arc::new(MockRequestService::with_users(&[(7, "alice", Some("jf-1"))]));
        let r = IdentityResolver::new(media.clone(), requests.clone());

        r.resolve_username("alice").await.unwrap();

        assert!(media.created.lock().unwrap().is_empty());
        assert!(media.deleted.lock().unwrap().is_empty());
        assert!(requests.deleted.lock().unwrap().is_empty());
    }
}
