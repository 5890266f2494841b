//! Decide whether a saved post should be syndicated
//!
//! Evaluated on every save, so the stored status is the only thing keeping
//! a post from going out twice. The check and the later write are not
//! atomic: two saves racing each other can both pass.

use serde::Serialize;

use crate::error::Result;
use crate::hooks::Hooks;
use crate::record::parse_publish_time;
use crate::store::{keys, Store};
use crate::types::PostSnapshot;

/// Why a post was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PostTypeNotAllowed,
    NotPublished,
    AlreadyAttempted,
    PublishedBeforeActivation,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::PostTypeNotAllowed => "post type is not syndicated",
            SkipReason::NotPublished => "post is not published",
            SkipReason::AlreadyAttempted => "post was already syndicated",
            SkipReason::PublishedBeforeActivation => "post predates activation",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Syndicate,
    Skip(SkipReason),
}

/// Read the activation time, `None` when never activated
pub async fn activated_at(store: &dyn Store) -> Result<Option<i64>> {
    let value = store.get_option(keys::ACTIVATED).await?;
    Ok(value.and_then(|v| v.trim().parse::<i64>().ok()))
}

/// Run the four gate checks in order: type, status, marker, activation time
pub async fn evaluate(
    store: &dyn Store,
    hooks: &Hooks,
    base_post_types: &[String],
    post: &PostSnapshot,
) -> Result<GateDecision> {
    let allowed = hooks.allowed_post_types(base_post_types, post);
    if !allowed.iter().any(|t| *t == post.post_type) {
        return Ok(GateDecision::Skip(SkipReason::PostTypeNotAllowed));
    }

    if !post.is_published() {
        return Ok(GateDecision::Skip(SkipReason::NotPublished));
    }

    if store.get_post_status(&post.id).await?.is_some() {
        return Ok(GateDecision::Skip(SkipReason::AlreadyAttempted));
    }

    if let Some(activated) = activated_at(store).await? {
        // An unreadable publish time counts as the epoch, i.e. before activation
        let published = parse_publish_time(&post.published_at_gmt)
            .map(|dt| dt.timestamp())
            .unwrap_or(0);
        if activated > published {
            return Ok(GateDecision::Skip(SkipReason::PublishedBeforeActivation));
        }
    }

    Ok(GateDecision::Syndicate)
}
