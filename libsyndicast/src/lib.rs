//! Syndicast - one-way syndication of published blog posts to Bluesky
//!
//! This library turns a published post into an `app.bsky.feed.post` record
//! and submits it to an AT Protocol PDS on the author's behalf, keeping the
//! password/access/refresh token session alive along the way.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod record;
pub mod service;
pub mod session;
pub mod store;
pub mod syndicator;
pub mod types;
pub mod xrpc;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use db::Database;
pub use error::{Result, SyndicastError};
pub use hooks::Hooks;
pub use record::{RecordBuilder, SyndicationRecord};
pub use service::SyndicastService;
pub use session::SessionManager;
pub use store::{MemoryStore, Store};
pub use syndicator::Syndicator;
pub use types::{PostSnapshot, SyndicationOutcome, SyndicationStatus};
