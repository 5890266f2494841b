//! Bluesky account credentials and their persisted form
//!
//! `Credentials` is the in-memory view of the six credential options. Every
//! setter writes through to the `Store` before returning, so a crash between
//! calls never leaves memory ahead of disk.

use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;
use crate::store::{keys, Store};

/// Ensure the domain ends with exactly one `/`
///
/// Trailing slashes and backslashes are stripped first, so both
/// `https://bsky.social` and `https://bsky.social//` normalize to
/// `https://bsky.social/`.
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches(['/', '\\']);
    format!("{}/", trimmed)
}

pub struct Credentials {
    domain: String,
    identifier: String,
    password: SecretString,
    access_jwt: String,
    refresh_jwt: String,
    did: String,
}

impl Credentials {
    /// Empty credentials pointing at `domain`
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            identifier: String::new(),
            password: SecretString::from(String::new()),
            access_jwt: String::new(),
            refresh_jwt: String::new(),
            did: String::new(),
        }
    }

    /// Read every credential option, using `default_domain` when none is stored
    pub async fn load(store: &dyn Store, default_domain: &str) -> Result<Self> {
        let domain = store
            .get_option(keys::DOMAIN)
            .await?
            .unwrap_or_else(|| default_domain.to_string());

        Ok(Self {
            domain,
            identifier: store.get_option(keys::IDENTIFIER).await?.unwrap_or_default(),
            password: SecretString::from(store.get_option(keys::PASSWORD).await?.unwrap_or_default()),
            access_jwt: store.get_option(keys::ACCESS_JWT).await?.unwrap_or_default(),
            refresh_jwt: store.get_option(keys::REFRESH_JWT).await?.unwrap_or_default(),
            did: store.get_option(keys::DID).await?.unwrap_or_default(),
        })
    }

    /// Domain as stored, without normalization
    pub fn raw_domain(&self) -> &str {
        &self.domain
    }

    /// Domain with a single trailing slash, ready for endpoint paths
    pub fn domain(&self) -> String {
        normalize_domain(&self.domain)
    }

    /// Full URL of an XRPC method, e.g. `https://bsky.social/xrpc/com.atproto.server.createSession`
    pub fn endpoint(&self, nsid: &str) -> String {
        format!("{}xrpc/{}", self.domain(), nsid)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }

    pub fn access_jwt(&self) -> &str {
        &self.access_jwt
    }

    pub fn refresh_jwt(&self) -> &str {
        &self.refresh_jwt
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// Session usable iff access token, DID and domain are all present
    pub fn is_session_valid(&self) -> bool {
        !self.access_jwt.is_empty() && !self.did.is_empty() && !self.domain.trim().is_empty()
    }

    pub async fn set_domain(&mut self, store: &dyn Store, domain: &str) -> Result<()> {
        store.set_option(keys::DOMAIN, domain).await?;
        self.domain = domain.to_string();
        Ok(())
    }

    pub async fn set_identifier(&mut self, store: &dyn Store, identifier: &str) -> Result<()> {
        store.set_option(keys::IDENTIFIER, identifier).await?;
        self.identifier = identifier.to_string();
        Ok(())
    }

    pub async fn set_password(&mut self, store: &dyn Store, password: SecretString) -> Result<()> {
        store
            .set_option(keys::PASSWORD, password.expose_secret())
            .await?;
        self.password = password;
        Ok(())
    }

    pub async fn set_access_jwt(&mut self, store: &dyn Store, token: &str) -> Result<()> {
        store.set_option(keys::ACCESS_JWT, token).await?;
        self.access_jwt = token.to_string();
        Ok(())
    }

    pub async fn set_refresh_jwt(&mut self, store: &dyn Store, token: &str) -> Result<()> {
        store.set_option(keys::REFRESH_JWT, token).await?;
        self.refresh_jwt = token.to_string();
        Ok(())
    }

    pub async fn set_did(&mut self, store: &dyn Store, did: &str) -> Result<()> {
        store.set_option(keys::DID, did).await?;
        self.did = did.to_string();
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &str| if value.is_empty() { "" } else { "[REDACTED]" };

        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("identifier", &self.identifier)
            .field("password", &redact(self.password.expose_secret()))
            .field("access_jwt", &redact(&self.access_jwt))
            .field("refresh_jwt", &redact(&self.refresh_jwt))
            .field("did", &self.did)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("https://bsky.social"), "https://bsky.social/");
        assert_eq!(normalize_domain("https://bsky.social/"), "https://bsky.social/");
        assert_eq!(normalize_domain("https://bsky.social///"), "https://bsky.social/");
        assert_eq!(normalize_domain("https://pds.example.com\\"), "https://pds.example.com/");
        assert_eq!(normalize_domain("  https://bsky.social  "), "https://bsky.social/");
    }

    #[test]
    fn test_endpoint() {
        let credentials = Credentials::new("https://bsky.social");
        assert_eq!(
            credentials.endpoint("com.atproto.server.createSession"),
            "https://bsky.social/xrpc/com.atproto.server.createSession"
        );
    }

    #[tokio::test]
    async fn test_load_uses_default_domain() {
        let store = MemoryStore::new();
        let credentials = Credentials::load(&store, "https://bsky.social").await.unwrap();

        assert_eq!(credentials.domain(), "https://bsky.social/");
        assert_eq!(credentials.identifier(), "");
        assert!(!credentials.has_password());
        assert!(!credentials.is_session_valid());
    }

    #[tokio::test]
    async fn test_load_reads_stored_values() {
        let store = MemoryStore::with_options([
            (keys::DOMAIN, "https://pds.example.com"),
            (keys::IDENTIFIER, "me.example.com"),
            (keys::PASSWORD, "app-password"),
            (keys::ACCESS_JWT, "access"),
            (keys::REFRESH_JWT, "refresh"),
            (keys::DID, "did:plc:abc"),
        ]);

        let credentials = Credentials::load(&store, "https://bsky.social").await.unwrap();

        assert_eq!(credentials.domain(), "https://pds.example.com/");
        assert_eq!(credentials.identifier(), "me.example.com");
        assert_eq!(credentials.password(), "app-password");
        assert_eq!(credentials.access_jwt(), "access");
        assert_eq!(credentials.refresh_jwt(), "refresh");
        assert_eq!(credentials.did(), "did:plc:abc");
        assert!(credentials.is_session_valid());
    }

    #[tokio::test]
    async fn test_setters_write_through() {
        let store = MemoryStore::new();
        let mut credentials = Credentials::new("https://bsky.social");

        credentials.set_access_jwt(&store, "a").await.unwrap();
        credentials.set_refresh_jwt(&store, "r").await.unwrap();
        credentials.set_did(&store, "did:plc:x").await.unwrap();
        credentials
            .set_password(&store, SecretString::from(String::new()))
            .await
            .unwrap();

        let options = store.options();
        assert_eq!(options.get(keys::ACCESS_JWT).map(String::as_str), Some("a"));
        assert_eq!(options.get(keys::REFRESH_JWT).map(String::as_str), Some("r"));
        assert_eq!(options.get(keys::DID).map(String::as_str), Some("did:plc:x"));
        assert_eq!(options.get(keys::PASSWORD).map(String::as_str), Some(""));
    }

    #[test]
    fn test_session_validity_requires_all_parts() {
        let mut credentials = Credentials::new("https://bsky.social");
        credentials.access_jwt = "access".to_string();
        assert!(!credentials.is_session_valid());

        credentials.did = "did:plc:abc".to_string();
        assert!(credentials.is_session_valid());

        credentials.domain = "   ".to_string();
        assert!(!credentials.is_session_valid());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut credentials = Credentials::new("https://bsky.social");
        credentials.password = SecretString::from("hunter2".to_string());
        credentials.access_jwt = "eyJhbGciOi.access".to_string();

        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("eyJhbGciOi"));
        assert!(debug.contains("[REDACTED]"));
    }
}
