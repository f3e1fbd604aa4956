//! In-memory TTL cache behind the media-browsing commands.
//!
//! Pagination callbacks re-read the result set that produced the original
//! message; caching avoids re-querying Jellyseerr on every button press.
//! Owned by the app state and injected, never attached to the HTTP client.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moka::sync::Cache;

use crate::integrations::jellyseerr::{MediaRequest, MediaResult};

/// How long a cached result set stays valid.
const RESULT_TTL: Duration = Duration::from_secs(3600);

pub struct MediaCache {
    /// Search results keyed by the raw query string.
    search: Cache<String, Arc<Vec<MediaResult>>>,
    /// Singleton discover listing: key "discover".
    discover: Cache<&'static str, Arc<Vec<MediaResult>>>,
    /// Request listings keyed by chat user id.
    requests: Cache<String, Arc<Vec<MediaRequest>>>,
    /// Items already requested this process lifetime, for button state.
    requested: Mutex<HashSet<(String, i64)>>,
}

impl MediaCache {
    pub fn new() -> Self {
        Self {
            search: Cache::builder()
                .time_to_live(RESULT_TTL)
                .max_capacity(256)
                .build(),
            discover: Cache::builder()
                .time_to_live(RESULT_TTL)
                .max_capacity(1)
                .build(),
            requests: Cache::builder()
                .time_to_live(RESULT_TTL)
                .max_capacity(256)
                .build(),
            requested: Mutex::new(HashSet::new()),
        }
    }

    pub fn get_search(&self, query: &str) -> Option<Arc<Vec<MediaResult>>> {
        self.search.get(query)
    }

    pub fn set_search(&self, query: &str, results: Arc<Vec<MediaResult>>) {
        self.search.insert(query.to_string(), results);
    }

    pub fn get_discover(&self) -> Option<Arc<Vec<MediaResult>>> {
        self.discover.get(&"discover")
    }

    pub fn set_discover(&self, results: Arc<Vec<MediaResult>>) {
        self.discover.insert("discover", results);
    }

    pub fn get_requests(&self, chat_user_id: &str) -> Option<Arc<Vec<MediaRequest>>> {
        self.requests.get(chat_user_id)
    }

    pub fn set_requests(&self, chat_user_id: &str, results: Arc<Vec<MediaRequest>>) {
        self.requests.insert(chat_user_id.to_string(), results);
    }

    pub fn mark_requested(&self, media_type: &str, tmdb_id: i64) {
        self.requested
            .lock()
            .unwrap()
            .insert((media_type.to_string(), tmdb_id));
    }

    pub fn is_requested(&self, media_type: &str, tmdb_id: i64) -> bool {
        self.requested
            .lock()
            .unwrap()
            .contains(&(media_type.to_string(), tmdb_id))
    }
}

impl Default for MediaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_cache_roundtrip() {
        let cache = MediaCache::new();
        assert!(cache.get_search("dune").is_none());
        cache.set_search("dune", Arc::new(Vec::new()));
        assert!(cache.get_search("dune").is_some());
        assert!(cache.get_search("other").is_none());
    }

    #[test]
    fn test_requested_markers() {
        let cache = MediaCache::new();
        assert!(!cache.is_requested("movie", 550));
        cache.mark_requested("movie", 550);
        assert!(cache.is_requested("movie", 550));
        assert!(!cache.is_requested("tv", 550));
    }
}
