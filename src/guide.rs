//! Logical structure of the human-readable timecode guide.
//!
//! Rendering is a pure transformation from the ranked cluster list into
//! three ordered sections; the Markdown writer in [`crate::export`]
//! transcribes the result verbatim.

use crate::aggregate::{ExtractionReport, TimecodedComment};
use crate::config::ExtractConfig;
use crate::normalize::Timecode;

/// One entry of the guide's leading "top timecodes" section.
#[derive(Debug, Clone, PartialEq)]
pub struct TopTimecode {
    pub label: String,
    pub score: f64,
    pub mentions: usize,
    /// Context text from the cluster's highest-liked member.
    pub context: String,
}

/// One entry of the context section, present for every cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextLine {
    pub label: String,
    pub context: String,
}

/// The guide's three ordered sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Guide {
    pub video_title: String,
    /// First `top_timecodes` clusters from the ranked sequence.
    pub top_timecodes: Vec<TopTimecode>,
    /// Every cluster, ranked order.
    pub context_lines: Vec<ContextLine>,
    /// Every comment that produced at least one timecode, fetch order.
    pub comments: Vec<TimecodedComment>,
}

/// Builds the guide structure from a finalized extraction report.
///
/// An empty report renders a valid, empty guide.
pub fn render(video_title: &str, report: &ExtractionReport, config: &ExtractConfig) -> Guide {
    let top_timecodes = report
        .clusters
        .iter()
        .take(config.top_timecodes)
        .map(|cluster| TopTimecode {
            label: format_timecode(cluster.representative_offset_seconds),
            score: cluster.score,
            mentions: cluster.members.len(),
            context: highest_liked(&cluster.members)
                .map(|member| member.context_text.clone())
                .unwrap_or_default(),
        })
        .collect();

    let context_lines = report
        .clusters
        .iter()
        .map(|cluster| ContextLine {
            label: format_timecode(cluster.representative_offset_seconds),
            context: cluster
                .members
                .first()
                .map(|member| member.context_text.clone())
                .unwrap_or_default(),
        })
        .collect();

    Guide {
        video_title: video_title.to_owned(),
        top_timecodes,
        context_lines,
        comments: report.timecoded_comments.clone(),
    }
}

/// First member with the maximum like count; first seen wins ties.
fn highest_liked(members: &[Timecode]) -> Option<&Timecode> {
    let mut best: Option<&Timecode> = None;
    for member in members {
        if best.is_none_or(|current| member.like_count > current.like_count) {
            best = Some(member);
        }
    }
    best
}

/// Renders an offset as zero-padded `MM:SS` under an hour, `H:MM:SS`
/// otherwise. Used for every guide line and label so offsets always read
/// the same way.
pub fn format_timecode(seconds: u32) -> String {
    if seconds < 3600 {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!(
            "{}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}
