//! Build `app.bsky.feed.post` records from posts
//!
//! The builder computes each field's default, then passes it through the
//! matching hook chain:
//! 1. `$type` (default `app.bsky.feed.post`)
//! 2. `text` (default `"{title} {permalink}"`)
//! 3. `facets` (default: one link facet over the permalink, if the final
//!    text still contains it)
//!
//! Facet offsets are UTF-8 byte offsets into the final text, as the AT
//! Protocol rich-text lexicon requires.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::hooks::Hooks;
use crate::types::PostSnapshot;

pub const DEFAULT_RECORD_TYPE: &str = "app.bsky.feed.post";
pub const LINK_FEATURE_TYPE: &str = "app.bsky.richtext.facet#link";

/// Host format for GMT publish dates
const HOST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A post record as sent inside `createRecord`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyndicationRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub text: String,
    pub facets: Vec<Facet>,
}

/// Byte range of `text` annotated with rich-text features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

impl Facet {
    /// A facet linking `text[byte_start..byte_end]` to `uri`
    pub fn link(byte_start: usize, byte_end: usize, uri: &str) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![FacetFeature {
                feature_type: LINK_FEATURE_TYPE.to_string(),
                uri: uri.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSlice {
    #[serde(rename = "byteStart")]
    pub byte_start: usize,
    #[serde(rename = "byteEnd")]
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFeature {
    #[serde(rename = "$type")]
    pub feature_type: String,
    pub uri: String,
}

/// Parse a publish timestamp as RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn parse_publish_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, HOST_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// One link facet over the first occurrence of `permalink` in `text`
fn link_facets(text: &str, permalink: &str) -> Vec<Facet> {
    if permalink.is_empty() {
        return Vec::new();
    }

    match text.find(permalink) {
        Some(byte_start) => vec![Facet::link(
            byte_start,
            byte_start + permalink.len(),
            permalink,
        )],
        None => Vec::new(),
    }
}

pub struct RecordBuilder<'a> {
    hooks: &'a Hooks,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(hooks: &'a Hooks) -> Self {
        Self { hooks }
    }

    /// Build the record for `post`, with `createdAt` falling back to now
    pub fn build(&self, post: &PostSnapshot) -> SyndicationRecord {
        self.build_at(post, Utc::now())
    }

    /// Build the record, using `now` when the publish time cannot be parsed
    pub fn build_at(&self, post: &PostSnapshot, now: DateTime<Utc>) -> SyndicationRecord {
        let created_at = parse_publish_time(&post.published_at_gmt).unwrap_or_else(|| {
            tracing::debug!(
                post_id = %post.id,
                "Unparseable publish time '{}', using current time",
                post.published_at_gmt
            );
            now
        });

        let record_type = self
            .hooks
            .record_type
            .apply(DEFAULT_RECORD_TYPE.to_string(), post);

        let default_text = format!("{} {}", post.title, post.permalink);
        let text = self.hooks.record_text.apply(default_text, post);

        // Offsets must be taken against the final text
        let facets = self
            .hooks
            .record_facets
            .apply(link_facets(&text, &post.permalink), post);

        SyndicationRecord {
            record_type,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, false),
            text,
            facets,
        }
    }
}
