//! Core types for Syndicast

use serde::{Deserialize, Serialize};

/// Post status value the host uses for live content
pub const PUBLISHED: &str = "publish";

/// Read-only view of a post at the moment it was saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: String,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    pub status: String,
    pub title: String,
    pub permalink: String,
    /// Publish time in UTC, RFC 3339 or `YYYY-MM-DD HH:MM:SS`
    pub published_at_gmt: String,
}

fn default_post_type() -> String {
    crate::config::DEFAULT_POST_TYPE.to_string()
}

impl PostSnapshot {
    pub fn is_published(&self) -> bool {
        self.status == PUBLISHED
    }
}

/// How a submission attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyndicationOutcome {
    /// createRecord answered below 300
    Delivered,
    /// createRecord answered 300 or above; body kept verbatim
    Rejected,
    /// No response at all; body holds the error description
    TransportFailed,
}

impl SyndicationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::TransportFailed => "transport_failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "delivered" => Some(Self::Delivered),
            "rejected" => Some(Self::Rejected),
            "transport_failed" => Some(Self::TransportFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyndicationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-post marker written after every submission attempt.
///
/// Its presence alone means "do not syndicate this post again".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyndicationStatus {
    pub outcome: SyndicationOutcome,
    pub body: String,
    pub recorded_at: i64,
}

impl SyndicationStatus {
    pub fn new(outcome: SyndicationOutcome, body: String) -> Self {
        Self {
            outcome,
            body,
            recorded_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_post_type() {
        let post: PostSnapshot = serde_json::from_str(
            r#"{
                "id": "42",
                "status": "publish",
                "title": "Hello",
                "permalink": "https://example.com/hello",
                "published_at_gmt": "2024-05-01 12:00:00"
            }"#,
        )
        .unwrap();

        assert_eq!(post.post_type, "post");
        assert!(post.is_published());
    }

    #[test]
    fn test_only_publish_status_counts_as_published() {
        let mut post = PostSnapshot {
            id: "1".to_string(),
            post_type: "post".to_string(),
            status: "draft".to_string(),
            title: String::new(),
            permalink: String::new(),
            published_at_gmt: String::new(),
        };
        assert!(!post.is_published());

        post.status = "Publish".to_string();
        assert!(!post.is_published());

        post.status = "publish".to_string();
        assert!(post.is_published());
    }

    #[test]
    fn test_outcome_db_strings() {
        for outcome in [
            SyndicationOutcome::Delivered,
            SyndicationOutcome::Rejected,
            SyndicationOutcome::TransportFailed,
        ] {
            assert_eq!(SyndicationOutcome::from_db_str(outcome.as_str()), Some(outcome));
        }
        assert_eq!(SyndicationOutcome::from_db_str("posted"), None);
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&SyndicationOutcome::TransportFailed).unwrap();
        assert_eq!(json, "\"transport_failed\"");
    }
}
