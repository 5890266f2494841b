//! Session lifecycle against an AT Protocol PDS
//!
//! The manager moves between two states:
//! - **Unauthenticated**: no access token or DID stored
//! - **Authenticated**: access token, refresh token and DID stored
//!
//! `establish_session` trades identifier + password for a token pair and
//! then forgets the password. `refresh_session` rotates the token pair.
//! Remote failures never change stored state: they are logged and reported
//! through `SessionOutcome`, and the caller decides via
//! `is_session_valid` whether it can go on.

use std::sync::Arc;

use secrecy::SecretString;

use crate::credentials::Credentials;
use crate::error::{Result, XrpcError};
use crate::record::SyndicationRecord;
use crate::store::Store;
use crate::xrpc::{
    HttpResponse, HttpTransport, CREATE_RECORD, CREATE_SESSION, POST_COLLECTION, REFRESH_SESSION,
};

/// What a session call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A new token pair and DID were stored; the password was cleared
    Established { did: String },
    /// The token pair was rotated
    Refreshed,
    /// Preconditions were not met, nothing was sent
    Skipped(&'static str),
    /// The remote call failed; stored credentials are untouched
    Failed(XrpcError),
}

/// Pull a non-empty string field out of a response body
fn required_field(data: &serde_json::Value, field: &str) -> std::result::Result<String, XrpcError> {
    data.get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| XrpcError::Incomplete(format!("response missing '{}'", field)))
}

struct TokenPair {
    access_jwt: String,
    refresh_jwt: String,
}

fn parse_token_pair(response: &HttpResponse) -> std::result::Result<TokenPair, XrpcError> {
    let data = response.json()?;
    Ok(TokenPair {
        access_jwt: required_field(&data, "accessJwt")?,
        refresh_jwt: required_field(&data, "refreshJwt")?,
    })
}

pub struct SessionManager {
    credentials: Credentials,
    store: Arc<dyn Store>,
    transport: Arc<dyn HttpTransport>,
}

impl SessionManager {
    /// Load persisted credentials and wrap them in a manager
    pub async fn load(
        store: Arc<dyn Store>,
        transport: Arc<dyn HttpTransport>,
        default_domain: &str,
    ) -> Result<Self> {
        let credentials = Credentials::load(store.as_ref(), default_domain).await?;
        tracing::debug!(?credentials, "Loaded credentials");

        Ok(Self {
            credentials,
            store,
            transport,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn is_session_valid(&self) -> bool {
        self.credentials.is_session_valid()
    }

    /// Store new login details ahead of `establish_session`
    pub async fn set_login(
        &mut self,
        domain: Option<&str>,
        identifier: &str,
        password: SecretString,
    ) -> Result<()> {
        let store = self.store.as_ref();
        if let Some(domain) = domain {
            self.credentials.set_domain(store, domain).await?;
        }
        self.credentials.set_identifier(store, identifier).await?;
        self.credentials.set_password(store, password).await?;
        Ok(())
    }

    /// Exchange identifier + password for a session
    ///
    /// A no-op unless domain, identifier and password are all set. On
    /// success the tokens and DID are persisted and the stored password is
    /// cleared; on any failure nothing is written.
    ///
    /// # Errors
    ///
    /// Only store failures are returned as `Err`. Remote failures come back
    /// as `Ok(SessionOutcome::Failed(_))`.
    pub async fn establish_session(&mut self) -> Result<SessionOutcome> {
        if self.credentials.raw_domain().trim().is_empty()
            || self.credentials.identifier().is_empty()
            || !self.credentials.has_password()
        {
            tracing::debug!("Skipping session creation: domain, identifier or password missing");
            return Ok(SessionOutcome::Skipped("domain, identifier or password missing"));
        }

        let url = self.credentials.endpoint(CREATE_SESSION);
        let body = serde_json::json!({
            "identifier": self.credentials.identifier(),
            "password": self.credentials.password(),
        });

        let result = async {
            let response = self
                .transport
                .post_json(&url, None, Some(&body))
                .await?
                .into_success()?;
            let tokens = parse_token_pair(&response)?;
            let did = required_field(&response.json()?, "did")?;
            Ok::<_, XrpcError>((tokens, did))
        }
        .await;

        let (tokens, did) = match result {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    identifier = %self.credentials.identifier(),
                    "Bluesky session creation failed: {}",
                    e
                );
                return Ok(SessionOutcome::Failed(e));
            }
        };

        let store = self.store.as_ref();
        self.credentials.set_access_jwt(store, &tokens.access_jwt).await?;
        self.credentials.set_refresh_jwt(store, &tokens.refresh_jwt).await?;
        self.credentials.set_did(store, &did).await?;
        self.credentials
            .set_password(store, SecretString::from(String::new()))
            .await?;

        tracing::info!(%did, "Bluesky session established");
        Ok(SessionOutcome::Established { did })
    }

    /// Rotate the access/refresh token pair
    ///
    /// Best effort: on failure the current tokens stay in place. The DID is
    /// not reissued by this call.
    ///
    /// # Errors
    ///
    /// Only store failures are returned as `Err`.
    pub async fn refresh_session(&mut self) -> Result<SessionOutcome> {
        if self.credentials.refresh_jwt().is_empty() {
            tracing::debug!("Skipping session refresh: no refresh token stored");
            return Ok(SessionOutcome::Skipped("no refresh token stored"));
        }

        let url = self.credentials.endpoint(REFRESH_SESSION);

        let result = async {
            let response = self
                .transport
                .post_json(&url, Some(self.credentials.refresh_jwt()), None)
                .await?
                .into_success()?;
            parse_token_pair(&response)
        }
        .await;

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Bluesky session refresh failed: {}", e);
                return Ok(SessionOutcome::Failed(e));
            }
        };

        let store = self.store.as_ref();
        self.credentials.set_access_jwt(store, &tokens.access_jwt).await?;
        self.credentials.set_refresh_jwt(store, &tokens.refresh_jwt).await?;

        tracing::debug!("Bluesky session refreshed");
        Ok(SessionOutcome::Refreshed)
    }

    /// Submit `record` to the account's repo with the current access token
    ///
    /// Returns the raw response for any HTTP status; `Err` means no response
    /// was received.
    pub async fn create_record(
        &self,
        record: &SyndicationRecord,
    ) -> std::result::Result<HttpResponse, XrpcError> {
        let did = self.credentials.did();
        let body = serde_json::json!({
            "collection": POST_COLLECTION,
            "did": did,
            "repo": did,
            "record": record,
        });

        self.transport
            .post_json(
                &self.credentials.endpoint(CREATE_RECORD),
                Some(self.credentials.access_jwt()),
                Some(&body),
            )
            .await
    }
}
