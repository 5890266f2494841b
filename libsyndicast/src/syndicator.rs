//! Syndicate one post: refresh, build, submit, record
//!
//! Nothing escapes `syndicate` as an error. An invalid session aborts
//! without writing anything; every submission attempt, successful or not,
//! leaves a `SyndicationStatus` behind as the "already attempted" marker.

use std::sync::Arc;

use crate::hooks::Hooks;
use crate::record::{RecordBuilder, SyndicationRecord};
use crate::session::SessionManager;
use crate::store::Store;
use crate::types::{PostSnapshot, SyndicationOutcome, SyndicationStatus};

/// Result of one `syndicate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyndicateResult {
    /// No usable session after the refresh; nothing was sent or stored
    Aborted,
    /// The record was submitted (or the submission failed in transit) and
    /// the status below was stored
    Attempted(SyndicationStatus),
}

pub struct Syndicator {
    session: SessionManager,
    store: Arc<dyn Store>,
    hooks: Arc<Hooks>,
}

impl Syndicator {
    pub fn new(session: SessionManager, store: Arc<dyn Store>, hooks: Arc<Hooks>) -> Self {
        Self {
            session,
            store,
            hooks,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Build the record for `post` without sending it
    pub fn build_record(&self, post: &PostSnapshot) -> SyndicationRecord {
        RecordBuilder::new(&self.hooks).build(post)
    }

    /// Send `post` to Bluesky and store the outcome against it
    pub async fn syndicate(&mut self, post: &PostSnapshot) -> SyndicateResult {
        // Always refresh first; token age is not tracked
        if let Err(e) = self.session.refresh_session().await {
            tracing::warn!(post_id = %post.id, "Could not persist refreshed session: {}", e);
        }

        if !self.session.is_session_valid() {
            tracing::warn!(
                post_id = %post.id,
                "No valid Bluesky session, skipping syndication"
            );
            return SyndicateResult::Aborted;
        }

        let record = self.build_record(post);
        tracing::debug!(post_id = %post.id, text = %record.text, "Submitting record");

        let status = match self.session.create_record(&record).await {
            Ok(response) => {
                let outcome = if response.is_success() {
                    SyndicationOutcome::Delivered
                } else {
                    SyndicationOutcome::Rejected
                };
                SyndicationStatus::new(outcome, response.body)
            }
            Err(e) => SyndicationStatus::new(SyndicationOutcome::TransportFailed, e.to_string()),
        };

        match status.outcome {
            SyndicationOutcome::Delivered => {
                tracing::info!(post_id = %post.id, "Syndicated post to Bluesky")
            }
            _ => tracing::warn!(
                post_id = %post.id,
                outcome = %status.outcome,
                "Bluesky did not accept post: {}",
                status.body
            ),
        }

        if let Err(e) = self.store.set_post_status(&post.id, &status).await {
            tracing::error!(post_id = %post.id, "Failed to store syndication status: {}", e);
        }

        SyndicateResult::Attempted(status)
    }
}
