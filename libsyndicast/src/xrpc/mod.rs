//! HTTP seam for the AT Protocol XRPC calls
//!
//! All three remote calls are JSON `POST`s under `{domain}xrpc/`. The
//! `HttpTransport` trait keeps the wire client swappable: `ReqwestTransport`
//! talks to a real PDS, `MockTransport` replays canned answers in tests.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use libsyndicast::xrpc::{HttpTransport, ReqwestTransport, CREATE_SESSION};
//!
//! # async fn example() -> libsyndicast::Result<()> {
//! let transport = ReqwestTransport::new(Duration::from_secs(5))?;
//! let body = serde_json::json!({"identifier": "me.bsky.social", "password": "app-password"});
//!
//! let url = format!("https://bsky.social/xrpc/{}", CREATE_SESSION);
//! match transport.post_json(&url, None, Some(&body)).await {
//!     Ok(response) => println!("HTTP {}", response.status),
//!     Err(e) => eprintln!("unreachable: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::XrpcError;

pub mod client;
pub mod mock;

pub use client::ReqwestTransport;
pub use mock::{MockReply, MockTransport, RecordedRequest};

pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
pub const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
pub const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

/// Collection every syndicated record is written to
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// A completed HTTP exchange, whatever its status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Anything below 300 counts as success, matching the PDS conventions
    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    /// Turn a non-success status into `XrpcError::Status`
    pub fn into_success(self) -> Result<Self, XrpcError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(XrpcError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Parse the body as JSON; malformed bodies become `XrpcError::Incomplete`
    pub fn json(&self) -> Result<serde_json::Value, XrpcError> {
        serde_json::from_str(&self.body)
            .map_err(|e| XrpcError::Incomplete(format!("response is not JSON: {}", e)))
    }
}

/// Minimal JSON-over-HTTP client
///
/// Implementations must only return `Err` when no HTTP response was
/// received. Error statuses are returned as `Ok(HttpResponse)` so callers can
/// decide what a 4xx means for them.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// `POST` to `url` with `Content-Type: application/json`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute endpoint URL
    /// * `bearer` - Token for the `Authorization: Bearer` header, if any
    /// * `body` - JSON body; `None` sends an empty body
    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, XrpcError>;
}
