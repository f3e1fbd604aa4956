//! Account creation saga.
//!
//! Creates one managed identity across Jellyfin and Jellyseerr and persists
//! the link, or fails with no orphaned state wherever rollback is possible:
//!
//!   CheckExisting -> CreateMediaUser -> ImportRequestUser -> PersistLink -> Notify
//!
//! Failures before the Jellyfin account exists abort with nothing to undo.
//! Once it exists, a failed import (and failed reconciliation) deletes it
//! again before aborting. A ledger write failure after both upstream accounts
//! exist is NOT compensated; the error names the step so the operator can
//! clean up by hand.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;

use crate::accounts::resolver::{IdentityResolver, RECONCILE_DELAY};
use crate::accounts::store::LinkedAccountStore;
use crate::channels::Transport;
use crate::error::Error;
use crate::integrations::{MediaServerApi, RequestServiceApi};
use crate::models::{LinkedAccount, ProvisioningRequest};

/// Bytes of entropy behind each generated password.
const PASSWORD_ENTROPY_BYTES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CheckExisting,
    CreateMediaUser,
    ImportRequestUser,
    PersistLink,
}

#[derive(Debug)]
pub struct ProvisionError {
    pub step: ProvisionStep,
    pub error: Error,
    /// Whether the just-created Jellyfin account was deleted again before
    /// aborting.
    pub rolled_back: bool,
}

impl ProvisionError {
    fn at(step: ProvisionStep, error: Error) -> Self {
        Self {
            step,
            error,
            rolled_back: false,
        }
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            ProvisionStep::CheckExisting => match &self.error {
                Error::Conflict { .. } => write!(f, "{}", self.error),
                other => write!(f, "failed to check for existing users: {}", other),
            },
            ProvisionStep::CreateMediaUser => {
                write!(f, "failed to create Jellyfin user: {}", self.error)
            }
            ProvisionStep::ImportRequestUser => {
                if self.rolled_back {
                    write!(
                        f,
                        "failed to import/find user in Jellyseerr ({}); rolled back Jellyfin user creation",
                        self.error
                    )
                } else {
                    write!(f, "failed to import/find user in Jellyseerr: {}", self.error)
                }
            }
            ProvisionStep::PersistLink => write!(
                f,
                "both upstream accounts were created but saving the link failed: {}",
                self.error
            ),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
pub struct ProvisionOutcome {
    pub account: LinkedAccount,
    pub username: String,
    pub password: String,
    /// False when the credentials DM could not be delivered; the operator
    /// must hand them over out of band.
    pub notified: bool,
}

/// Public base URLs included in the credentials DM.
#[derive(Clone)]
pub struct ServiceUrls {
    pub jellyfin: String,
    pub jellyseerr: String,
}

pub struct AccountProvisioner {
    resolver: Arc<IdentityResolver>,
    media: Arc<dyn MediaServerApi>,
    requests: Arc<dyn RequestServiceApi>,
    store: Arc<dyn LinkedAccountStore>,
    transport: Arc<dyn Transport>,
    urls: ServiceUrls,
}

impl AccountProvisioner {
    pub fn new(
        resolver: Arc<IdentityResolver>,
        media: Arc<dyn MediaServerApi>,
        requests: Arc<dyn RequestServiceApi>,
        store: Arc<dyn LinkedAccountStore>,
        transport: Arc<dyn Transport>,
        urls: ServiceUrls,
    ) -> Self {
        Self {
            resolver,
            media,
            requests,
            store,
            transport,
            urls,
        }
    }

    pub async fn provision(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let username = sanitize_username(&request.display_name)
            .unwrap_or_else(|| format!("tg_user_{}", request.chat_user_id));
        let password = generate_password();

        // Step 1: existence check. Conflicts abort before any mutation.
        match self.resolver.find_by_username(&username).await {
            Ok(Some(existing)) => {
                return Err(ProvisionError::at(
                    ProvisionStep::CheckExisting,
                    Error::Conflict {
                        username,
                        existing_id: existing.media_user_id,
                    },
                ));
            }
            Ok(None) => {}
            Err(e) => return Err(ProvisionError::at(ProvisionStep::CheckExisting, e)),
        }

        // Step 2: create the Jellyfin account. Nothing to undo on failure.
        let media_user = self
            .media
            .create_user(&username, &password)
            .await
            .map_err(|e| ProvisionError::at(ProvisionStep::CreateMediaUser, e))?;
        log::info!(
            "[PROVISION] Created Jellyfin user {} ({})",
            username,
            media_user.id
        );

        // Step 3: import into Jellyseerr, reconciling once if the import
        // fails. If neither works, delete the Jellyfin account again.
        let request_user_id = match self.import_or_reconcile(&media_user.id, &username).await {
            Ok(id) => id,
            Err(cause) => {
                log::error!(
                    "[PROVISION] Could not establish Jellyseerr identity for {}: {}. Rolling back.",
                    username,
                    cause
                );
                if let Err(del) = self.media.delete_user(&media_user.id).await {
                    log::error!(
                        "[PROVISION] Rollback delete of Jellyfin user {} failed: {}",
                        media_user.id,
                        del
                    );
                }
                return Err(ProvisionError {
                    step: ProvisionStep::ImportRequestUser,
                    error: cause,
                    rolled_back: true,
                });
            }
        };

        if let Some(role) = &request.role_name {
            log::info!("[PROVISION] User {} assigned virtual role '{}'", username, role);
        }

        // Step 4: persist the link. No compensation on failure.
        let expires_at = request
            .duration_days
            .map(|days| Utc::now() + Duration::days(days));
        let account = LinkedAccount {
            chat_user_id: request.chat_user_id.clone(),
            request_user_id: Some(request_user_id),
            media_user_id: Some(media_user.id.clone()),
            username: username.clone(),
            created_at: None,
            expires_at,
            guild_id: None,
            role_name: request.role_name.clone(),
        };
        self.store
            .upsert(&account)
            .map_err(|e| ProvisionError::at(ProvisionStep::PersistLink, e))?;

        // Step 5: best-effort credentials DM.
        let dm = self.welcome_message(&username, &password, request.duration_days);
        let notified = match self
            .transport
            .send_direct_message(&request.chat_user_id, &dm)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[PROVISION] {}", e);
                false
            }
        };

        Ok(ProvisionOutcome {
            account,
            username,
            password,
            notified,
        })
    }

    /// Bulk-import the new Jellyfin id into Jellyseerr; on failure wait out
    /// the propagation delay and walk the directory instead.
    async fn import_or_reconcile(
        &self,
        media_user_id: &str,
        username: &str,
    ) -> Result<String, Error> {
        let import_failure = match self
            .requests
            .import_from_media_server(&[media_user_id.to_string()])
            .await
        {
            Ok(users) => match users.into_iter().next() {
                Some(user) => return Ok(user.id.to_string()),
                None => Error::NotFound(format!(
                    "import of '{}' returned no Jellyseerr user",
                    username
                )),
            },
            Err(e) => e,
        };

        log::warn!(
            "[PROVISION] Failed to auto-import {} to Jellyseerr: {}. Trying to find them...",
            username,
            import_failure
        );
        tokio::time::sleep(RECONCILE_DELAY).await;

        match self.resolver.reconcile(media_user_id).await {
            Ok(Some(identity)) => identity
                .request_user_id
                .ok_or(import_failure),
            Ok(None) => Err(import_failure),
            Err(e) => Err(e),
        }
    }

    fn welcome_message(&self, username: &str, password: &str, duration_days: Option<i64>) -> String {
        let mut text = format!(
            "🎉 <b>Welcome to the Media Server!</b>\n\n\
             An account has been created for you. Here are your login details:\n\n\
             <b>Username:</b> <code>{}</code>\n\
             <b>Temporary Password:</b> <code>{}</code>\n\n\
             Please change your password after logging in.\n\n\
             🔗 Jellyfin: {}\n\
             🔗 Jellyseerr: {}",
            username, password, self.urls.jellyfin, self.urls.jellyseerr
        );
        if let Some(days) = duration_days {
            text.push_str(&format!(
                "\n\n<b>Note:</b> This is a temporary account that will expire in {} days.",
                days
            ));
        }
        text
    }
}

/// Strip everything outside `[A-Za-z0-9.-]`. `None` when nothing survives.
pub fn sanitize_username(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// URL-safe random password with `PASSWORD_ENTROPY_BYTES` bytes of entropy.
pub fn generate_password() -> String {
    let mut bytes = [0u8; PASSWORD_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
