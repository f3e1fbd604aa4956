//! Jellyseerr API client.
//!
//! User directory and import endpoints for the account lifecycle, plus the
//! search/discover/request surface behind the media commands.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Service};
use crate::integrations::check_status;

const AUTH_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JellyseerrUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Jellyfin id as Jellyseerr reports it. The API has returned both string
    /// and numeric forms, so this stays a raw value with a typed accessor.
    #[serde(default)]
    pub jellyfin_user_id: Option<Value>,
}

impl JellyseerrUser {
    pub fn jellyfin_user_id_str(&self) -> Option<String> {
        self.jellyfin_user_id.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn matches_media_user(&self, media_user_id: &str) -> bool {
        self.jellyfin_user_id_str()
            .map(|id| id == media_user_id)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResult {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub media: Option<RequestMedia>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMedia {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct PagedResponse<T> {
    #[serde(default)]
    results: Vec<T>,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    #[serde(rename = "jellyfinUserIds")]
    jellyfin_user_ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewRequest<'a> {
    media_type: &'a str,
    media_id: i64,
    user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seasons: Option<&'a str>,
}

#[async_trait]
pub trait RequestServiceApi: Send + Sync {
    async fn list_users(&self, take: u32) -> Result<Vec<JellyseerrUser>, Error>;
    async fn import_from_media_server(
        &self,
        media_user_ids: &[String],
    ) -> Result<Vec<JellyseerrUser>, Error>;
    async fn delete_user(&self, user_id: &str) -> Result<(), Error>;
    async fn search(&self, query: &str) -> Result<Vec<MediaResult>, Error>;
    async fn discover_movies(&self) -> Result<Vec<MediaResult>, Error>;
    async fn discover_tv(&self) -> Result<Vec<MediaResult>, Error>;
    async fn media_details(&self, media_type: &str, tmdb_id: i64) -> Result<MediaResult, Error>;
    async fn create_request(
        &self,
        media_type: &str,
        tmdb_id: i64,
        request_user_id: i64,
    ) -> Result<(), Error>;
    async fn list_requests(
        &self,
        requested_by: &str,
        take: u32,
    ) -> Result<Vec<MediaRequest>, Error>;
}

pub struct JellyseerrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl JellyseerrClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn err(e: reqwest::Error) -> Error {
        Error::upstream(Service::Jellyseerr, e)
    }

    async fn get_results<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<Vec<T>, Error> {
        let resp = self
            .http
            .get(url)
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(Self::err)?;
        let parsed: PagedResponse<T> = check_status(Service::Jellyseerr, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl RequestServiceApi for JellyseerrClient {
    async fn list_users(&self, take: u32) -> Result<Vec<JellyseerrUser>, Error> {
        self.get_results(format!("{}/api/v1/user?take={}", self.base_url, take))
            .await
    }

    async fn import_from_media_server(
        &self,
        media_user_ids: &[String],
    ) -> Result<Vec<JellyseerrUser>, Error> {
        let resp = self
            .http
            .post(format!(
                "{}/api/v1/user/import-from-jellyfin",
                self.base_url
            ))
            .header(AUTH_HEADER, &self.api_key)
            .json(&ImportRequest {
                jellyfin_user_ids: media_user_ids,
            })
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyseerr, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        let resp = self
            .http
            .delete(format!("{}/api/v1/user/{}", self.base_url, user_id))
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyseerr, resp).await?;
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<MediaResult>, Error> {
        self.get_results(format!(
            "{}/api/v1/search?query={}",
            self.base_url,
            urlencoding::encode(query)
        ))
        .await
    }

    async fn discover_movies(&self) -> Result<Vec<MediaResult>, Error> {
        self.get_results(format!("{}/api/v1/discover/movies", self.base_url))
            .await
    }

    async fn discover_tv(&self) -> Result<Vec<MediaResult>, Error> {
        self.get_results(format!("{}/api/v1/discover/tv", self.base_url))
            .await
    }

    async fn media_details(&self, media_type: &str, tmdb_id: i64) -> Result<MediaResult, Error> {
        let resp = self
            .http
            .get(format!(
                "{}/api/v1/{}/{}",
                self.base_url, media_type, tmdb_id
            ))
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyseerr, resp)
            .await?
            .json()
            .await
            .map_err(Self::err)
    }

    async fn create_request(
        &self,
        media_type: &str,
        tmdb_id: i64,
        request_user_id: i64,
    ) -> Result<(), Error> {
        // TV requests ask for all seasons, matching the bot's one-tap flow.
        let seasons = if media_type == "tv" { Some("all") } else { None };
        let resp = self
            .http
            .post(format!("{}/api/v1/request", self.base_url))
            .header(AUTH_HEADER, &self.api_key)
            .json(&NewRequest {
                media_type,
                media_id: tmdb_id,
                user_id: request_user_id,
                seasons,
            })
            .send()
            .await
            .map_err(Self::err)?;
        check_status(Service::Jellyseerr, resp).await?;
        Ok(())
    }

    async fn list_requests(
        &self,
        requested_by: &str,
        take: u32,
    ) -> Result<Vec<MediaRequest>, Error> {
        self.get_results(format!(
            "{}/api/v1/request?take={}&skip=0&sort=added&filter=all&requestedBy={}",
            self.base_url, take, requested_by
        ))
        .await
    }
}
