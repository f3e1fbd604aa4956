//! Account removal, shared by manual `/deleteuser` and the expiry sweep.
//!
//! Deletion order is fixed: Jellyfin, then Jellyseerr, then the ledger row.
//! A Jellyseerr 404 means the target state (absence) already holds and is
//! treated as success; a Jellyfin failure of any kind aborts before the
//! Jellyseerr step runs. The ledger row is only removed after both upstream
//! steps were attempted without a fatal error.

use std::fmt;
use std::sync::Arc;

use crate::accounts::store::LinkedAccountStore;
use crate::error::{Error, Service};
use crate::integrations::{MediaServerApi, RequestServiceApi};
use crate::models::LinkedAccount;

/// Resolved ids for one deletion. Both upstream ids are individually
/// optional: the caller fills in whatever the ledger or the resolver could
/// produce. Without a chat identity there is no ledger row to remove.
#[derive(Debug, Clone, Default)]
pub struct DeprovisionTarget {
    pub chat_user_id: Option<String>,
    pub media_user_id: Option<String>,
    pub request_user_id: Option<String>,
}

impl From<&LinkedAccount> for DeprovisionTarget {
    fn from(account: &LinkedAccount) -> Self {
        Self {
            chat_user_id: Some(account.chat_user_id.clone()),
            media_user_id: account.media_user_id.clone(),
            request_user_id: account.request_user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprovisionStep {
    MediaDelete,
    RequestDelete,
    LedgerDelete,
}

#[derive(Debug)]
pub struct DeprovisionError {
    pub step: DeprovisionStep,
    pub error: Error,
}

impl fmt::Display for DeprovisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            DeprovisionStep::MediaDelete => {
                write!(f, "failed to delete Jellyfin user: {}", self.error)
            }
            DeprovisionStep::RequestDelete => {
                write!(f, "failed to delete Jellyseerr user: {}", self.error)
            }
            DeprovisionStep::LedgerDelete => {
                write!(f, "failed to remove the account link: {}", self.error)
            }
        }
    }
}

impl std::error::Error for DeprovisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Which deletions actually happened. A step skipped for lack of an id, or a
/// Jellyseerr delete answered with 404, leaves its flag false.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeprovisionReport {
    pub media_deleted: bool,
    pub request_deleted: bool,
    pub ledger_deleted: bool,
}

pub struct AccountDeprovisioner {
    media: Arc<dyn MediaServerApi>,
    requests: Arc<dyn RequestServiceApi>,
    store: Arc<dyn LinkedAccountStore>,
}

impl AccountDeprovisioner {
    pub fn new(
        media: Arc<dyn MediaServerApi>,
        requests: Arc<dyn RequestServiceApi>,
        store: Arc<dyn LinkedAccountStore>,
    ) -> Self {
        Self {
            media,
            requests,
            store,
        }
    }

    pub async fn deprovision(
        &self,
        target: &DeprovisionTarget,
    ) -> Result<DeprovisionReport, DeprovisionError> {
        let mut report = DeprovisionReport::default();

        if let Some(media_id) = &target.media_user_id {
            self.media
                .delete_user(media_id)
                .await
                .map_err(|error| DeprovisionError {
                    step: DeprovisionStep::MediaDelete,
                    error,
                })?;
            report.media_deleted = true;
            log::info!("[DEPROVISION] Deleted Jellyfin user: {}", media_id);
        }

        match &target.request_user_id {
            Some(request_id) => match self.requests.delete_user(request_id).await {
                Ok(()) => {
                    report.request_deleted = true;
                    log::info!("[DEPROVISION] Deleted Jellyseerr user: {}", request_id);
                }
                Err(e) if e.is_not_found_from(Service::Jellyseerr) => {
                    log::info!(
                        "[DEPROVISION] Jellyseerr user {} was already absent",
                        request_id
                    );
                }
                Err(error) => {
                    return Err(DeprovisionError {
                        step: DeprovisionStep::RequestDelete,
                        error,
                    });
                }
            },
            None => {
                log::warn!("[DEPROVISION] No Jellyseerr id known, skipping that step");
            }
        }

        if let Some(chat_user_id) = &target.chat_user_id {
            self.store
                .delete(chat_user_id)
                .map_err(|error| DeprovisionError {
                    step: DeprovisionStep::LedgerDelete,
                    error,
                })?;
            report.ledger_deleted = true;
            log::info!("[DEPROVISION] Unlinked account: {}", chat_user_id);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::testing::{MemoryStore, MockMediaServer, MockRequestService};
    use crate::models::LinkedAccount;

    fn account(chat_user_id: &str) -> LinkedAccount {
        LinkedAccount {
            chat_user_id: chat_user_id.to_string(),
            request_user_id: Some("41".to_string()),
            media_user_id: Some("jf-1".to_string()),
            username: "alice".to_string(),
            created_at: None,
            expires_at: None,
            guild_id: None,
            role_name: None,
        }
    }

    struct Fixture {
        media: Arc<MockMediaServer>,
        requests: Arc<MockRequestService>,
        store: Arc<MemoryStore>,
        deprovisioner: AccountDeprovisioner,
    }

    fn fixture(
        media: MockMediaServer,
        requests: MockRequestService,
        store: MemoryStore,
    ) -> Fixture {
        let media = Arc::new(media);
        let requests = Arc::new(requests);
        let store = Arc::new(store);
        let deprovisioner =
            AccountDeprovisioner::new(media.clone(), requests.clone(), store.clone());
        Fixture {
            media,
            requests,
            store,
            deprovisioner,
        }
    }

    #[tokio::test]
    async fn test_full_deletion_in_order() {
        let f = fixture(
            MockMediaServer::default(),
            MockRequestService::default(),
            MemoryStore::with_accounts(vec![account("123")]),
        );

        let report = f
            .deprovisioner
            .deprovision(&DeprovisionTarget::from(&account("123")))
            .await
            .unwrap();
        assert_eq!(
            report,
            DeprovisionReport {
                media_deleted: true,
                request_deleted: true,
                ledger_deleted: true,
            }
        );
        assert_eq!(f.media.deleted.lock().unwrap().as_slice(), ["jf-1"]);
        assert_eq!(f.requests.deleted.lock().unwrap().as_slice(), ["41"]);
        assert_eq!(f.store.len(), 0);
    }

    #[tokio::test]
    async fn test_request_service_404_is_success() {
        let mut requests = MockRequestService::default();
        requests.delete_not_found.insert("41".to_string());
        let f = fixture(
            MockMediaServer::default(),
            requests,
            MemoryStore::with_accounts(vec![account("123")]),
        );

        let report = f
            .deprovisioner
            .deprovision(&DeprovisionTarget::from(&account("123")))
            .await
            .unwrap();
        assert!(report.ledger_deleted);
        assert!(!report.request_deleted);
        assert_eq!(f.store.len(), 0);
    }

    #[tokio::test]
    async fn test_media_delete_failure_aborts_everything_after() {
        let f = fixture(
            MockMediaServer::failing_delete(&["jf-1"]),
            MockRequestService::default(),
            MemoryStore::with_accounts(vec![account("123")]),
        );

        let err = f
            .deprovisioner
            .deprovision(&DeprovisionTarget::from(&account("123")))
            .await
            .unwrap_err();
        assert_eq!(err.step, DeprovisionStep::MediaDelete);
        assert!(matches!(err.error, Error::UpstreamNetwork { .. }));

        // The Jellyseerr delete never ran and the ledger row survived.
        assert!(f.requests.deleted.lock().unwrap().is_empty());
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_request_delete_failure_keeps_ledger_row() {
        let mut requests = MockRequestService::default();
        requests.fail_delete.insert("41".to_string());
        let f = fixture(
            MockMediaServer::default(),
            requests,
            MemoryStore::with_accounts(vec![account("123")]),
        );

        let err = f
            .deprovisioner
            .deprovision(&DeprovisionTarget::from(&account("123")))
            .await
            .unwrap_err();
        assert_eq!(err.step, DeprovisionStep::RequestDelete);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_request_id_skips_that_step() {
        let mut acct = account("123");
        acct.request_user_id = None;
        let f = fixture(
            MockMediaServer::default(),
            MockRequestService::default(),
            MemoryStore::with_accounts(vec![acct.clone()]),
        );

        let report = f
            .deprovisioner
            .deprovision(&DeprovisionTarget::from(&acct))
            .await
            .unwrap();
        assert!(report.media_deleted);
        assert!(!report.request_deleted);
        assert!(report.ledger_deleted);
        assert!(f.requests.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_target_without_ledger_row_touches_only_upstreams() {
        let f = fixture(
            MockMediaServer::default(),
            MockRequestService::default(),
            MemoryStore::default(),
        );

        let target = DeprovisionTarget {
            chat_user_id: None,
            media_user_id: Some("jf-9".to_string()),
            request_user_id: Some("77".to_string()),
        };
        let report = f.deprovisioner.deprovision(&target).await.unwrap();
        assert!(report.media_deleted);
        assert!(report.request_deleted);
        assert!(!report.ledger_deleted);
    }
}
