//! Service layer for Syndicast
//!
//! `SyndicastService` is the single entry point the binaries (or any other
//! host adapter) talk to. It maps host lifecycle events onto the core:
//!
//! - `on_activate` / `on_deactivate`: activation time and refresh schedule
//! - `on_post_saved`: publish gate, then syndication
//! - `on_refresh_tick`: scheduled session refresh
//! - `connect` / `status`: credential setup and inspection
//!
//! Every handler builds a fresh `SessionManager` from the store, so
//! credentials written by another process are always picked up.
//!
//! # Example
//!
//! ```no_run
//! use libsyndicast::service::SyndicastService;
//! use libsyndicast::PostSnapshot;
//!
//! # async fn example() -> libsyndicast::Result<()> {
//! let service = SyndicastService::new().await?;
//! service.on_activate(chrono::Utc::now()).await?;
//!
//! let post = PostSnapshot {
//!     id: "42".to_string(),
//!     post_type: "post".to_string(),
//!     status: "publish".to_string(),
//!     title: "Hello".to_string(),
//!     permalink: "https://example.com/hello".to_string(),
//!     published_at_gmt: "2030-01-01 00:00:00".to_string(),
//! };
//! let outcome = service.on_post_saved(&post).await;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod gate;
pub mod schedule;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;

use self::gate::{GateDecision, SkipReason};
use self::schedule::{RefreshSchedule, ScheduleState};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Result, SyndicastError};
use crate::hooks::Hooks;
use crate::record::{RecordBuilder, SyndicationRecord};
use crate::session::{SessionManager, SessionOutcome};
use crate::store::{keys, Store};
use crate::syndicator::{SyndicateResult, Syndicator};
use crate::types::{PostSnapshot, SyndicationStatus};
use crate::xrpc::{HttpTransport, ReqwestTransport};

/// What happened to a saved post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostSavedOutcome {
    /// The gate turned the post away
    Skipped(SkipReason),
    /// The gate passed but there was no usable session; nothing stored
    Aborted,
    /// A submission was attempted and its status stored
    Attempted(SyndicationStatus),
    /// Local state could not be read; logged, nothing sent
    Failed(String),
}

/// What a refresh tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The schedule was cancelled (or never set up)
    NotScheduled,
    NotDue(DateTime<Utc>),
    Refreshed {
        outcome: SessionOutcome,
        next_run: DateTime<Utc>,
    },
}

/// Snapshot of the connection for operators. Never contains secrets.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub domain: String,
    pub identifier: String,
    pub did: String,
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub password_pending: bool,
    pub session_valid: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    pub store_backend: String,
}

pub struct SyndicastService {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    transport: Arc<dyn HttpTransport>,
    hooks: Arc<Hooks>,
}

impl SyndicastService {
    /// Create a service from the config file (or defaults when there is none)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database
    /// cannot be opened, or the HTTP client cannot be built.
    pub async fn new() -> Result<Self> {
        let config = Config::load_or_default()?;
        Self::from_config(config).await
    }

    /// Create a service backed by SQLite and a real HTTP client
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::new(&config.database_path()).await?;
        let transport = ReqwestTransport::new(config.bluesky.timeout()?)?;

        Ok(Self::with_parts(
            config,
            Arc::new(db),
            Arc::new(transport),
            Hooks::new(),
        ))
    }

    /// Assemble a service from explicit parts, e.g. `MemoryStore` + `MockTransport`
    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store>,
        transport: Arc<dyn HttpTransport>,
        hooks: Hooks,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            transport,
            hooks: Arc::new(hooks),
        }
    }

    /// Replace the registered hooks
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn session(&self) -> Result<SessionManager> {
        SessionManager::load(
            self.store.clone(),
            self.transport.clone(),
            &self.config.bluesky.domain,
        )
        .await
    }

    fn schedule(&self) -> Result<RefreshSchedule> {
        RefreshSchedule::new(self.store.clone(), self.config.schedule.refresh_interval()?)
    }

    /// Record the first activation and start the daily refresh
    ///
    /// Re-activating keeps the original activation time, so posts published
    /// in between are never back-filled.
    pub async fn on_activate(&self, now: DateTime<Utc>) -> Result<()> {
        if gate::activated_at(self.store.as_ref()).await?.is_none() {
            self.store
                .set_option(keys::ACTIVATED, &now.timestamp().to_string())
                .await?;
            tracing::info!(activated_at = %now, "Recorded activation time");
        }

        if self.schedule()?.ensure_scheduled(now).await? {
            tracing::info!("Scheduled daily session refresh");
        }

        Ok(())
    }

    /// Cancel the recurring refresh
    pub async fn on_deactivate(&self) -> Result<()> {
        self.schedule()?.cancel().await?;
        tracing::info!("Cancelled scheduled session refresh");
        Ok(())
    }

    /// Gate a saved post and syndicate it when it qualifies
    pub async fn on_post_saved(&self, post: &PostSnapshot) -> PostSavedOutcome {
        let decision = gate::evaluate(
            self.store.as_ref(),
            &self.hooks,
            &self.config.syndication.post_types,
            post,
        )
        .await;

        match decision {
            Ok(GateDecision::Syndicate) => {}
            Ok(GateDecision::Skip(reason)) => {
                tracing::debug!(post_id = %post.id, %reason, "Not syndicating post");
                return PostSavedOutcome::Skipped(reason);
            }
            Err(e) => {
                tracing::error!(post_id = %post.id, "Publish gate failed: {}", e);
                return PostSavedOutcome::Failed(e.to_string());
            }
        }

        match self.syndicate(post).await {
            Ok(SyndicateResult::Aborted) => PostSavedOutcome::Aborted,
            Ok(SyndicateResult::Attempted(status)) => PostSavedOutcome::Attempted(status),
            Err(e) => {
                tracing::error!(post_id = %post.id, "Could not load credentials: {}", e);
                PostSavedOutcome::Failed(e.to_string())
            }
        }
    }

    /// Syndicate `post` without consulting the gate
    pub async fn syndicate(&self, post: &PostSnapshot) -> Result<SyndicateResult> {
        let session = self.session().await?;
        let mut syndicator = Syndicator::new(session, self.store.clone(), self.hooks.clone());
        Ok(syndicator.syndicate(post).await)
    }

    /// Build the record `post` would produce, without sending it
    pub fn preview(&self, post: &PostSnapshot) -> SyndicationRecord {
        RecordBuilder::new(&self.hooks).build(post)
    }

    /// Refresh the session if the schedule says it is due
    pub async fn on_refresh_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let schedule = self.schedule()?;

        match schedule.state(now).await? {
            ScheduleState::NotScheduled => return Ok(TickOutcome::NotScheduled),
            ScheduleState::NotDue(next) => return Ok(TickOutcome::NotDue(next)),
            ScheduleState::Due => {}
        }

        let mut session = self.session().await?;
        let outcome = session.refresh_session().await?;
        let next_run = schedule.advance(now).await?;

        tracing::info!(next_run = %next_run, "Scheduled refresh finished: {:?}", outcome);
        Ok(TickOutcome::Refreshed { outcome, next_run })
    }

    /// Store login details and try to open a session with them
    ///
    /// # Errors
    ///
    /// Returns `SyndicastError::Validation` when identifier or password is
    /// blank. Remote failures are reported in the returned outcome.
    pub async fn connect(
        &self,
        domain: Option<&str>,
        identifier: &str,
        password: SecretString,
    ) -> Result<SessionOutcome> {
        use secrecy::ExposeSecret;

        if identifier.trim().is_empty() {
            return Err(SyndicastError::Validation("identifier is blank".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(SyndicastError::Validation("password is blank".to_string()));
        }
        if let Some(domain) = domain {
            if !(domain.starts_with("http://") || domain.starts_with("https://")) {
                return Err(SyndicastError::Validation(format!(
                    "domain must be a URL including http(s): {}",
                    domain
                )));
            }
        }

        let mut session = self.session().await?;
        session
            .set_login(domain, identifier.trim(), password)
            .await?;
        session.establish_session().await
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let session = self.session().await?;
        let credentials = session.credentials();
        let activated_at = gate::activated_at(self.store.as_ref())
            .await?
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        Ok(StatusReport {
            domain: credentials.domain(),
            identifier: credentials.identifier().to_string(),
            did: credentials.did().to_string(),
            has_access_token: !credentials.access_jwt().is_empty(),
            has_refresh_token: !credentials.refresh_jwt().is_empty(),
            password_pending: credentials.has_password(),
            session_valid: credentials.is_session_valid(),
            activated_at,
            next_refresh: self.schedule()?.next_run().await?,
            store_backend: self.store.backend_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::xrpc::{MockReply, MockTransport, CREATE_SESSION, REFRESH_SESSION};
    use chrono::TimeZone;

    fn service(store: Arc<MemoryStore>, mock: &MockTransport) -> SyndicastService {
        let mut config = Config::default();
        config.bluesky.domain = "https://pds.test".to_string();
        SyndicastService::with_parts(config, store, Arc::new(mock.clone()), Hooks::new())
    }

    #[tokio::test]
    async fn test_activation_time_is_kept_on_reactivation() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), &MockTransport::new());
        let first = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        service.on_activate(first).await.unwrap();
        service.on_deactivate().await.unwrap();
        service.on_activate(second).await.unwrap();

        let status = service.status().await.unwrap();
        assert_eq!(status.activated_at, Some(first));
        assert_eq!(status.next_refresh, Some(second));
    }

    #[tokio::test]
    async fn test_tick_after_deactivate_is_not_scheduled() {
        let store = Arc::new(MemoryStore::new());
        let mock = MockTransport::new();
        let service = service(store, &mock);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        service.on_activate(now).await.unwrap();
        service.on_deactivate().await.unwrap();

        assert_eq!(
            service.on_refresh_tick(now).await.unwrap(),
            TickOutcome::NotScheduled
        );
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_tick_refreshes_once_per_interval() {
        let store = Arc::new(MemoryStore::with_options([(keys::REFRESH_JWT, "r")]));
        let mock = MockTransport::new();
        mock.on(
            REFRESH_SESSION,
            MockReply::ok_json(serde_json::json!({"accessJwt": "a2", "refreshJwt": "r2"})),
        );
        let service = service(store, &mock);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        service.on_activate(now).await.unwrap();

        let first = service.on_refresh_tick(now).await.unwrap();
        assert_eq!(
            first,
            TickOutcome::Refreshed {
                outcome: SessionOutcome::Refreshed,
                next_run: tomorrow
            }
        );

        let second = service.on_refresh_tick(now).await.unwrap();
        assert_eq!(second, TickOutcome::NotDue(tomorrow));
        assert_eq!(mock.call_count(REFRESH_SESSION), 1);
    }

    #[tokio::test]
    async fn test_connect_validates_input() {
        let service = service(Arc::new(MemoryStore::new()), &MockTransport::new());

        let blank = service
            .connect(None, "  ", SecretString::from("pw".to_string()))
            .await;
        assert!(matches!(blank, Err(SyndicastError::Validation(_))));

        let no_scheme = service
            .connect(
                Some("bsky.social"),
                "me.bsky.social",
                SecretString::from("pw".to_string()),
            )
            .await;
        assert!(matches!(no_scheme, Err(SyndicastError::Validation(_))));
    }

    #[tokio::test]
    async fn test_connect_establishes_session() {
        let store = Arc::new(MemoryStore::new());
        let mock = MockTransport::new();
        mock.on(
            CREATE_SESSION,
            MockReply::ok_json(serde_json::json!({
                "accessJwt": "a", "refreshJwt": "r", "did": "did:plc:me"
            })),
        );
        let service = service(store.clone(), &mock);

        let outcome = service
            .connect(
                Some("https://other.pds"),
                "me.other.pds",
                SecretString::from("pw".to_string()),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, SessionOutcome::Established { .. }));
        assert_eq!(
            mock.requests_to(CREATE_SESSION)[0].url,
            "https://other.pds/xrpc/com.atproto.server.createSession"
        );

        let status = service.status().await.unwrap();
        assert_eq!(status.domain, "https://other.pds/");
        assert_eq!(status.identifier, "me.other.pds");
        assert_eq!(status.did, "did:plc:me");
        assert!(status.session_valid);
        assert!(!status.password_pending);
        assert_eq!(status.store_backend, "memory");
    }
}
