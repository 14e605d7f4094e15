//! Comment records and the boundary that normalizes yt-dlp comment output.
//!
//! Everything downstream of this module (parser, aggregator, exports) works
//! on the fixed-shape [`Comment`] record. Raw yt-dlp entries are duck-typed
//! JSON with plenty of missing fields on old videos, so all the defaulting,
//! deduplication, and ordering happens here before a comment is ever scanned
//! for timestamps.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comment as consumed by the extraction engine and the export writers.
/// Immutable once built; `like_count` is clamped to zero at this boundary so
/// scoring never sees negative values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

/// Raw comment entry as yt-dlp emits it. Only `id` is required; everything
/// else is optional because older videos frequently lack metadata.
#[derive(Debug, Deserialize)]
pub struct RawComment {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub time_text: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Input ordering for the comment list. Relevance keeps yt-dlp's fetch
/// order; Time re-sorts by publish timestamp ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSortOrder {
    #[default]
    Relevance,
    Time,
}

impl CommentSortOrder {
    /// The `comment_sort` value handed to yt-dlp's extractor args.
    pub fn extractor_value(self) -> &'static str {
        match self {
            CommentSortOrder::Relevance => "top",
            CommentSortOrder::Time => "new",
        }
    }
}

impl FromStr for CommentSortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "relevance" => Ok(CommentSortOrder::Relevance),
            "time" => Ok(CommentSortOrder::Time),
            other => Err(format!(
                "invalid sort order '{other}' (expected 'relevance' or 'time')"
            )),
        }
    }
}

/// Normalizes a list of raw yt-dlp comment values into [`Comment`] records.
///
/// Malformed entries (no `id`, wrong shape) are dropped, as are duplicate
/// ids; both happen in practice when yt-dlp stitches reply pages together.
/// Order of the surviving records mirrors the input order.
pub fn from_raw_values(values: Vec<Value>) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut seen_ids = HashSet::new();

    for value in values {
        let Ok(raw) = serde_json::from_value::<RawComment>(value) else {
            continue;
        };
        if !seen_ids.insert(raw.id.clone()) {
            continue;
        }

        let published_at = raw
            .timestamp
            .and_then(timestamp_to_iso)
            .or(raw.time_text);

        comments.push(Comment {
            id: raw.id,
            author: raw.author.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            like_count: raw.like_count.unwrap_or(0).max(0),
            published_at,
        });
    }

    comments
}

/// Applies the configured ordering, then truncates to `max_comments`.
///
/// Truncation happens after ordering so a `time` sort keeps the oldest
/// comments rather than whatever page yt-dlp fetched first.
pub fn order_and_limit(
    comments: &mut Vec<Comment>,
    order: CommentSortOrder,
    max_comments: usize,
) {
    if order == CommentSortOrder::Time {
        comments.sort_by(|a, b| {
            a.published_at
                .clone()
                .unwrap_or_default()
                .cmp(&b.published_at.clone().unwrap_or_default())
        });
    }
    comments.truncate(max_comments);
}

/// Converts epoch seconds into an ISO-8601 string.
fn timestamp_to_iso(timestamp: i64) -> Option<String> {
    chrono::DateTime::<Utc>::from_timestamp(timestamp, 0).map(|datetime| datetime.to_rfc3339())
}
