//! Background sweep that reclaims expired accounts.
//!
//! One pass reads every ledger row carrying an expiry, deprovisions the
//! elapsed ones with the stored ids, and best-effort-notifies each affected
//! user. Expiry is a property of ledger data, not sweeper state: there is no
//! checkpoint, and a restarted process simply rescans on its next pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::accounts::deprovisioner::{AccountDeprovisioner, DeprovisionTarget};
use crate::accounts::store::LinkedAccountStore;
use crate::channels::Transport;
use crate::error::Error;

/// Fixed cadence between passes. No jitter, no backoff.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);

/// Poll step while waiting for the chat transport to come up.
const READINESS_POLL: Duration = Duration::from_secs(1);

const EXPIRY_NOTICE: &str =
    "Your temporary access to the media server has expired and your account has been deleted.";

pub struct ExpirySweeper {
    store: Arc<dyn LinkedAccountStore>,
    deprovisioner: Arc<AccountDeprovisioner>,
    transport: Arc<dyn Transport>,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<dyn LinkedAccountStore>,
        deprovisioner: Arc<AccountDeprovisioner>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            deprovisioner,
            transport,
        }
    }

    /// Long-running loop: wait for the transport, then sweep once per
    /// interval until cancelled. Sweeping before the transport is up would
    /// make every expiry notification fail.
    pub async fn run(&self, cancel: CancellationToken) {
        while !self.transport.is_connected() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(READINESS_POLL) => {}
            }
        }

        log::info!("[SWEEP] Starting daily check for expired accounts");
        loop {
            match self.sweep_once().await {
                Ok(reclaimed) if reclaimed > 0 => {
                    log::info!("[SWEEP] Pass complete: {} accounts reclaimed", reclaimed);
                }
                Ok(_) => {}
                Err(e) => log::error!("[SWEEP] Pass failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("[SWEEP] Stopped");
                    return;
                }
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
            }
        }
    }

    /// One pass over the ledger. A failure on one account is logged and does
    /// not stop the pass; only a failure to read the ledger itself aborts.
    pub async fn sweep_once(&self) -> Result<usize, Error> {
        let accounts = self.store.list_expiring()?;
        log::info!("[SWEEP] Checking {} accounts for expiration", accounts.len());

        let now = Utc::now();
        let mut reclaimed = 0usize;

        for account in &accounts {
            if !account.is_expired(now) {
                continue;
            }
            log::info!(
                "[SWEEP] Account {} ({}) has expired, deleting",
                account.chat_user_id,
                account.username
            );

            match self
                .deprovisioner
                .deprovision(&DeprovisionTarget::from(account))
                .await
            {
                Ok(_) => reclaimed += 1,
                Err(e) => {
                    log::error!(
                        "[SWEEP] Failed to delete expired account {}: {}",
                        account.chat_user_id,
                        e
                    );
                }
            }

            // Notified independent of deletion outcome.
            if let Err(e) = self
                .transport
                .send_direct_message(&account.chat_user_id, EXPIRY_NOTICE)
                .await
            {
                log::warn!("[SWEEP] {}", e);
            }
        }

        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::testing::{MemoryStore, MockMediaServer, MockRequestService, MockTransport};
    use crate::models::LinkedAccount;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::Ordering;

    fn account(chat_user_id: &str, media_id: &str, expires_in_hours: Option<i64>) -> LinkedAccount {
        LinkedAccount {
            chat_user_id: chat_user_id.to_string(),
            request_user_id: Some(format!("seerr-{}", chat_user_id)),
            media_user_id: Some(media_id.to_string()),
            username: format!("user{}", chat_user_id),
            created_at: None,
            expires_at: expires_in_hours.map(|h| Utc::now() + ChronoDuration::hours(h)),
            guild_id: None,
            role_name: None,
        }
    }

    struct Fixture {
        media: Arc<MockMediaServer>,
        requests: Arc<MockRequestService>,
        store: Arc<MemoryStore>,
        transport: Arc<MockTransport>,
        sweeper: ExpirySweeper,
    }

    fn fixture(media: MockMediaServer, accounts: Vec<LinkedAccount>) -> Fixture {
        let media = Arc::new(media);
        let requests = Arc::new(MockRequestService::default());
        let store = Arc::new(MemoryStore::with_accounts(accounts));
        let transport = Arc::new(MockTransport::default());
        let deprovisioner =
            Arc::new(AccountDeprovisioner::new(media.clone(), requests.clone(), store.clone()));
        let sweeper = ExpirySweeper::new(store.clone(), deprovisioner, transport.clone());
        Fixture {
            media,
            requests,
            store,
            transport,
            sweeper,
        }
    }

    #[tokio::test]
    async fn test_expired_account_is_reclaimed_and_user_notified() {
        let f = fixture(
            MockMediaServer::default(),
            vec![account("1", "jf-1", Some(-1))],
        );

        let reclaimed = f.sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert_eq!(f.media.deleted.lock().unwrap().as_slice(), ["jf-1"]);
        assert_eq!(f.requests.deleted.lock().unwrap().as_slice(), ["seerr-1"]);
        assert_eq!(f.store.len(), 0);

        let sent = f.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "1");
        assert!(sent[0].1.contains("expired"));
    }

    #[tokio::test]
    async fn test_future_expiry_is_untouched() {
        let f = fixture(
            MockMediaServer::default(),
            vec![account("1", "jf-1", Some(48))],
        );

        let reclaimed = f.sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 0);
        assert!(f.media.deleted.lock().unwrap().is_empty());
        assert_eq!(f.store.len(), 1);
        assert!(f.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_accounts_are_never_inspected() {
        let f = fixture(
            MockMediaServer::default(),
            vec![account("1", "jf-1", None)],
        );

        let reclaimed = f.sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 0);
        // list_expiring never returned the permanent row.
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_on_one_account_does_not_stop_the_pass() {
        // Account 1's Jellyfin delete fails with a network error; account 2
        // must still be processed in the same pass.
        let f = fixture(
            MockMediaServer::failing_delete(&["jf-1"]),
            vec![
                account("1", "jf-1", Some(-1)),
                account("2", "jf-2", Some(-1)),
            ],
        );

        let reclaimed = f.sweeper.sweep_once().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert_eq!(f.media.deleted.lock().unwrap().as_slice(), ["jf-2"]);
        // The failed account keeps its ledger row; the reclaimed one is gone.
        assert!(f.store.get_cloned("1").is_some());
        assert!(f.store.get_cloned("2").is_none());
        // Both users were notified regardless of deletion outcome.
        assert_eq!(f.transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_for_transport_and_stops_on_cancel() {
        let f = fixture(
            MockMediaServer::default(),
            vec![account("1", "jf-1", Some(-1))],
        );
        f.transport.connected.store(false, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let sweeper = Arc::new(f.sweeper);
        let run_handle = {
            let sweeper = sweeper.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { sweeper.run(cancel).await })
        };

        // Not connected yet: nothing happens.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.store.len(), 1);

        // Once connected, the first pass runs promptly.
        f.transport.connected.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.store.len(), 0);

        cancel.cancel();
        run_handle.await.unwrap();
    }
}
