//! `reqwest`-backed transport

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, XrpcError};
use crate::xrpc::{HttpResponse, HttpTransport};

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("syndicast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| XrpcError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<HttpResponse, XrpcError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| XrpcError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| XrpcError::Transport(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();

        // Port 9 (discard) on loopback is closed on any sane test machine
        let result = transport
            .post_json("http://127.0.0.1:9/xrpc/com.atproto.server.refreshSession", Some("t"), None)
            .await;

        assert!(matches!(result, Err(XrpcError::Transport(_))));
    }
}
