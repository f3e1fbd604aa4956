//! Shared test doubles for the lifecycle seams: both upstream clients, the
//! ledger contract, and the chat transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::accounts::store::LinkedAccountStore;
use crate::channels::Transport;
use crate::error::{Error, Service};
use crate::integrations::jellyfin::{JellyfinUser, MediaServerApi, PlayedItem};
use crate::integrations::jellyseerr::{
    JellyseerrUser, MediaRequest, MediaResult, RequestServiceApi,
};
use crate::models::LinkedAccount;

pub fn network_error(service: Service) -> Error {
    Error::UpstreamNetwork {
        service,
        message: "connection refused".to_string(),
    }
}

pub fn http_error(service: Service, status: u16) -> Error {
    Error::upstream_status(service, status, "upstream error".to_string())
}

// ── Jellyfin ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockMediaServer {
    pub users: Vec<JellyfinUser>,
    pub fail_list: bool,
    pub fail_create: bool,
    /// Deleting these ids fails with a network error.
    pub fail_delete: HashSet<String>,
    pub auth_user: Option<JellyfinUser>,
    pub played: Vec<PlayedItem>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockMediaServer {
    pub fn with_users(users: &[(&str, &str)]) -> Self {
        Self {
            users: users
                .iter()
                .map(|(id, name)| JellyfinUser {
                    id: id.to_string(),
                    name: name.to_string(),
                    policy: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_delete(ids: &[&str]) -> Self {
        Self {
            fail_delete: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaServerApi for MockMediaServer {
    async fn list_users(&self) -> Result<Vec<JellyfinUser>, Error> {
        if self.fail_list {
            return Err(network_error(Service::Jellyfin));
        }
        Ok(self.users.clone())
    }

    async fn create_user(&self, username: &str, _password: &str) -> Result<JellyfinUser, Error> {
        if self.fail_create {
            return Err(http_error(Service::Jellyfin, 400));
        }
        let mut created = self.created.lock().unwrap();
        created.push(username.to_string());
        Ok(JellyfinUser {
            id: format!("jf-new-{}", created.len()),
            name: username.to_string(),
            policy: None,
        })
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        if self.fail_delete.contains(user_id) {
            return Err(network_error(Service::Jellyfin));
        }
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }

    async fn authenticate_by_name(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<Option<JellyfinUser>, Error> {
        Ok(self.auth_user.clone())
    }

    async fn played_items(&self, _user_id: &str) -> Result<Vec<PlayedItem>, Error> {
        Ok(self.played.clone())
    }
}

// ── Jellyseerr ──────────────────────────────────────────────

#[derive(Default)]
pub enum ImportBehavior {
    #[default]
    Succeed,
    FailHttp,
    Empty,
}

#[derive(Default)]
pub struct MockRequestService {
    pub directory: Vec<JellyseerrUser>,
    pub import: ImportBehavior,
    pub fail_list: bool,
    /// Deleting these ids returns a 404.
    pub delete_not_found: HashSet<String>,
    /// Deleting these ids fails with a network error.
    pub fail_delete: HashSet<String>,
    pub search_results: Vec<MediaResult>,
    pub deleted: Mutex<Vec<String>>,
    pub imported: Mutex<Vec<Vec<String>>>,
    pub requested: Mutex<Vec<(String, i64, i64)>>,
}

pub fn seerr_user(id: i64, username: &str, media_user_id: Option<&str>) -> JellyseerrUser {
    JellyseerrUser {
        id,
        username: Some(username.to_string()),
        display_name: None,
        jellyfin_user_id: media_user_id.map(|s| json!(s)),
    }
}

impl MockRequestService {
    pub fn with_users(users: &[(i64, &str, Option<&str>)]) -> Self {
        Self {
            directory: users
                .iter()
                .map(|(id, name, media)| seerr_user(*id, name, *media))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_import(import: ImportBehavior) -> Self {
        Self {
            import,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RequestServiceApi for MockRequestService {
    async fn list_users(&self, _take: u32) -> Result<Vec<JellyseerrUser>, Error> {
        if self.fail_list {
            return Err(network_error(Service::Jellyseerr));
        }
        Ok(self.directory.clone())
    }

    async fn import_from_media_server(
        &self,
        media_user_ids: &[String],
    ) -> Result<Vec<JellyseerrUser>, Error> {
        self.imported.lock().unwrap().push(media_user_ids.to_vec());
        match self.import {
            ImportBehavior::Succeed => Ok(media_user_ids
                .iter()
                .enumerate()
                .map(|(i, id)| JellyseerrUser {
                    id: 900 + i as i64,
                    username: None,
                    display_name: None,
                    jellyfin_user_id: Some(json!(id)),
                })
                .collect()),
            ImportBehavior::FailHttp => Err(http_error(Service::Jellyseerr, 500)),
            ImportBehavior::Empty => Ok(Vec::new()),
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        if self.delete_not_found.contains(user_id) {
            return Err(http_error(Service::Jellyseerr, 404));
        }
        if self.fail_delete.contains(user_id) {
            return Err(network_error(Service::Jellyseerr));
        }
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }

    async fn search(&self, _query: &str) -> Result<Vec<MediaResult>, Error> {
        Ok(self.search_results.clone())
    }

    async fn discover_movies(&self) -> Result<Vec<MediaResult>, Error> {
        Ok(Vec::new())
    }

    async fn discover_tv(&self) -> Result<Vec<MediaResult>, Error> {
        Ok(Vec::new())
    }

    async fn media_details(&self, _media_type: &str, tmdb_id: i64) -> Result<MediaResult, Error> {
        self.search_results
            .iter()
            .find(|r| r.id == tmdb_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no media with TMDB id {}", tmdb_id)))
    }

    async fn create_request(
        &self,
        media_type: &str,
        tmdb_id: i64,
        request_user_id: i64,
    ) -> Result<(), Error> {
        self.requested
            .lock()
            .unwrap()
            .push((media_type.to_string(), tmdb_id, request_user_id));
        Ok(())
    }

    async fn list_requests(
        &self,
        _requested_by: &str,
        _take: u32,
    ) -> Result<Vec<MediaRequest>, Error> {
        Ok(Vec::new())
    }
}

// ── Ledger ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub accounts: Mutex<HashMap<String, LinkedAccount>>,
    pub fail_upsert: bool,
    pub fail_delete: bool,
}

impl MemoryStore {
    pub fn with_accounts(accounts: Vec<LinkedAccount>) -> Self {
        Self {
            accounts: Mutex::new(
                accounts
                    .into_iter()
                    .map(|a| (a.chat_user_id.clone(), a))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn get_cloned(&self, chat_user_id: &str) -> Option<LinkedAccount> {
        self.accounts.lock().unwrap().get(chat_user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

impl LinkedAccountStore for MemoryStore {
    fn get(&self, chat_user_id: &str) -> Result<Option<LinkedAccount>, Error> {
        Ok(self.get_cloned(chat_user_id))
    }

    fn get_by_username(&self, username: &str) -> Result<Option<LinkedAccount>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    fn upsert(&self, account: &LinkedAccount) -> Result<(), Error> {
        if self.fail_upsert {
            return Err(Error::Persistence("disk I/O error".to_string()));
        }
        self.accounts
            .lock()
            .unwrap()
            .insert(account.chat_user_id.clone(), account.clone());
        Ok(())
    }

    fn delete(&self, chat_user_id: &str) -> Result<(), Error> {
        if self.fail_delete {
            return Err(Error::Persistence("disk I/O error".to_string()));
        }
        self.accounts.lock().unwrap().remove(chat_user_id);
        Ok(())
    }

    fn list_expiring(&self) -> Result<Vec<LinkedAccount>, Error> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.expires_at.is_some())
            .cloned()
            .collect())
    }
}

// ── Transport ───────────────────────────────────────────────

pub struct MockTransport {
    pub connected: AtomicBool,
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_direct_message(&self, chat_user_id: &str, text: &str) -> Result<(), Error> {
        if self.fail {
            return Err(Error::Notification {
                chat_user_id: chat_user_id.to_string(),
                message: "user has blocked the bot".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_user_id.to_string(), text.to_string()));
        Ok(())
    }
}
