//! Jellyfin API client.
//!
//! Covers the user-management surface the bot needs (list, create, delete,
//! credential check) plus the played-items query behind `/watch`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Service};
use crate::integrations::check_status;

const AUTH_HEADER: &str = "X-Emby-Token";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub policy: Option<JellyfinPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinPolicy {
    #[serde(default)]
    pub is_administrator: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateUserRequest<'a> {
    name: &'a str,
    password: &'a str,
    policy: NewUserPolicy,
}

/// Fixed restrictive policy for bot-created accounts: non-admin, playback
/// enabled, live TV disabled.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NewUserPolicy {
    is_administrator: bool,
    enable_user_preference_access: bool,
    enable_media_playback: bool,
    enable_live_tv_access: bool,
    enable_live_tv_management: bool,
}

impl Default for NewUserPolicy {
    fn default() -> Self {
        Self {
            is_administrator: false,
            enable_user_preference_access: true,
            enable_media_playback: true,
            enable_live_tv_access: false,
            enable_live_tv_management: false,
        }
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Pw")]
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticateResponse {
    user: Option<JellyfinUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayedItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub user_data: Option<PlayedItemUserData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayedItemUserData {
    #[serde(default)]
    pub last_played_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<PlayedItem>,
}

#[async_trait]
pub trait MediaServerApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<JellyfinUser>, Error>;
    async fn create_user(&self, username: &str, password: &str) -> Result<JellyfinUser, Error>;
    async fn delete_user(&self, user_id: &str) -> Result<(), Error>;
    /// Credential check. `None` means the credentials were rejected (401);
    /// any other failure is an error.
    async fn authenticate_by_name(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<JellyfinUser>, Error>;
    async fn played_items(&self, user_id: &str) -> Result<Vec<PlayedItem>, Error>;
}

pub struct JellyfinClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl JellyfinClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn err(e: reqwest::Error) -> Error {
        Error::upstream(Service::Jellyfin, e)
    }
}

#[async_trait]
impl MediaServerApi for JellyfinClient {
    async fn list_users(&self) -> Result<Vec<JellyfinUser>, Error> {
        let resp = self
            .http
            .get(format!("{}/Users", self.base_url))
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyfin, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<JellyfinUser, Error> {
        let resp = self
            .http
            .post(format!("{}/Users/New", self.base_url))
            .header(AUTH_HEADER, &self.api_key)
            .json(&CreateUserRequest {
                name: username,
                password,
                policy: NewUserPolicy::default(),
            })
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyfin, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        let resp = self
            .http
            .delete(format!("{}/Users/{}", self.base_url, user_id))
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyfin, resp).await?;
        Ok(())
    }

    async fn authenticate_by_name(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<JellyfinUser>, Error> {
        let resp = self
            .http
            .post(format!("{}/Users/AuthenticateByName", self.base_url))
            .header(AUTH_HEADER, &self.api_key)
            .json(&AuthenticateRequest { username, password })
            .send()
            .await
            .map_err(Self::err)?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let parsed: AuthenticateResponse = check_status(Service::Jellyfin, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)?;
        Ok(parsed.user)
    }

    async fn played_items(&self, user_id: &str) -> Result<Vec<PlayedItem>, Error> {
        let resp = self
            .http
            .get(format!("{}/Users/{}/Items", self.base_url, user_id))
            .header(AUTH_HEADER, &self.api_key)
            .query(&[
                ("Recursive", "true"),
                ("IncludeItemTypes", "Movie,Episode"),
                ("Filters", "IsPlayed"),
                ("Fields", "RunTimeTicks,UserData,SeriesName"),
            ])
            .send()
            .await
            .map_err(Self::err)?;
        let parsed: ItemsResponse = check_status(Service::Jellyfin, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)?;
        Ok(parsed.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_pascal_case() {
        let user: JellyfinUser = serde_json::from_str(
            r#"{"Name": "Alice", "Id": "abc123", "Policy": {"IsAdministrator": true}}"#,
        )
        .unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.id, "abc123");
        assert!(user.policy.unwrap().is_administrator);
    }

    #[test]
    fn test_user_without_policy() {
        let user: JellyfinUser =
            serde_json::from_str(r#"{"Name": "Bob", "Id": "def"}"#).unwrap();
        assert!(user.policy.is_none());
    }

    #[test]
    fn test_new_user_policy_serializes_restrictive_defaults() {
        let json = serde_json::to_value(NewUserPolicy::default()).unwrap();
        assert_eq!(json["IsAdministrator"], false);
        assert_eq!(json["EnableMediaPlayback"], true);
        assert_eq!(json["EnableLiveTvAccess"], false);
    }

    #[test]
    fn test_played_item_fields() {
        let item: PlayedItem = serde_json::from_str(
            r#"{"Name": "Pilot", "Type": "Episode", "SeriesName": "Severance",
                "RunTimeTicks": 36000000000, "UserData": {"LastPlayedDate": "2026-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(item.series_name.as_deref(), Some("Severance"));
        assert_eq!(item.run_time_ticks, Some(36_000_000_000));
        assert!(item.user_data.unwrap().last_played_date.is_some());
    }
}
