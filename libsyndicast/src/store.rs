//! Durable key/value state behind the session and the publish gate
//!
//! The `Store` trait is the narrow persistence interface everything else is
//! written against:
//! - `Database`: SQLite-backed store used by the binaries
//! - `MemoryStore`: in-process store for tests and embedding
//!
//! Options hold the credentials, the activation time, and the refresh
//! schedule. Post statuses are kept separately, one per post id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::types::SyndicationStatus;

/// Option keys used by this crate
pub mod keys {
    pub const DOMAIN: &str = "bluesky_domain";
    pub const IDENTIFIER: &str = "bluesky_identifier";
    pub const PASSWORD: &str = "bluesky_password";
    pub const ACCESS_JWT: &str = "bluesky_access_jwt";
    pub const REFRESH_JWT: &str = "bluesky_refresh_jwt";
    pub const DID: &str = "bluesky_did";
    pub const ACTIVATED: &str = "syndicast_activated";
    pub const REFRESH_NEXT_RUN: &str = "syndicast_refresh_next_run";
}

/// Persistence interface for options and per-post statuses
///
/// Writes are last-write-wins per key; nothing here is transactional across
/// keys.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read an option, `None` when it was never set or was deleted
    async fn get_option(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite an option
    async fn set_option(&self, key: &str, value: &str) -> Result<()>;

    /// Remove an option. Deleting a missing option is not an error.
    async fn delete_option(&self, key: &str) -> Result<()>;

    /// Read the syndication status recorded for a post
    async fn get_post_status(&self, post_id: &str) -> Result<Option<SyndicationStatus>>;

    /// Record (or replace) the syndication status for a post
    async fn set_post_status(&self, post_id: &str, status: &SyndicationStatus) -> Result<()>;

    /// Name of the backend, for status output
    fn backend_name(&self) -> &str;
}

/// In-memory `Store`
#[derive(Default)]
pub struct MemoryStore {
    options: Mutex<HashMap<String, String>>,
    statuses: Mutex<HashMap<String, SyndicationStatus>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with options, handy in tests
    pub fn with_options<'a>(options: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.options.lock().unwrap_or_else(|e| e.into_inner());
            for (key, value) in options {
                map.insert(key.to_string(), value.to_string());
            }
        }
        store
    }

    /// Snapshot of every option currently held
    pub fn options(&self) -> HashMap<String, String> {
        self.options
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_option(&self, key: &str) -> Result<Option<String>> {
        let map = self.options.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    async fn set_option(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.options.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_option(&self, key: &str) -> Result<()> {
        let mut map = self.options.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
        Ok(())
    }

    async fn get_post_status(&self, post_id: &str) -> Result<Option<SyndicationStatus>> {
        let map = self.statuses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(post_id).cloned())
    }

    async fn set_post_status(&self, post_id: &str, status: &SyndicationStatus) -> Result<()> {
        let mut map = self.statuses.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(post_id.to_string(), status.clone());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
