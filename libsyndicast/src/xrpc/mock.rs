//! Mock transport for testing
//!
//! Replays a configured reply per XRPC method and records every request so
//! tests can assert on URLs, bearer tokens and bodies without network access.
//! Compiled into every build so integration tests and binaries' tests can
//! use it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::XrpcError;
use crate::xrpc::{HttpResponse, HttpTransport};

/// What the mock answers for a given XRPC method
#[derive(Debug, Clone)]
pub enum MockReply {
    /// An HTTP response with the given status and body
    Respond { status: u16, body: String },
    /// No response at all
    Unreachable(String),
}

impl MockReply {
    pub fn ok_json(body: serde_json::Value) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            body: body.to_string(),
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self::Unreachable(message.to_string())
    }
}

/// A request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    /// XRPC method name, the path segment after `xrpc/`
    pub fn method(&self) -> &str {
        self.url.rsplit("xrpc/").next().unwrap_or(&self.url)
    }
}

/// Mock transport; clones share the same replies and request log
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `method` (e.g. `com.atproto.server.createSession`) with `reply`
    pub fn on(&self, method: &str, reply: MockReply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(method.to_string(), reply);
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Requests sent to one XRPC method
    pub fn requests_to(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method() == method)
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.requests_to(method).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, XrpcError> {
        let request = RecordedRequest {
            url: url.to_string(),
            bearer: bearer.map(str::to_string),
            body: body.cloned(),
        };
        let method = request.method().to_string();

        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&method)
            .cloned();

        match reply {
            Some(MockReply::Respond { status, body }) => Ok(HttpResponse { status, body }),
            Some(MockReply::Unreachable(message)) => Err(XrpcError::Transport(message)),
            None => Err(XrpcError::Transport(format!("no mock reply for {}", method))),
        }
    }
}
