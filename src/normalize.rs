//! Conversion of parsed candidates into validated timecodes.

use serde::Serialize;

use crate::comments::Comment;
use crate::parser::Candidate;

/// A validated, normalized timestamp tied to one comment.
///
/// `like_count` is a snapshot copied from the owning comment at creation
/// time, not a live reference, so later mutation of the comment list can
/// never change a cluster's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timecode {
    pub offset_seconds: u32,
    pub source_comment_id: String,
    pub context_text: String,
    pub like_count: i64,
}

/// Rejection signal for a candidate that parsed fine but cannot be a real
/// position in this video. Expected and high-frequency, so this is plain
/// control flow rather than an error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeReject {
    /// Offset at or past the known end of the video.
    OutOfRange,
}

/// Converts a candidate into a [`Timecode`], checking it against the video
/// duration when one is known.
///
/// An unknown duration accepts the candidate speculatively: comments are
/// often posted before exact duration metadata propagates. Offset zero is
/// valid; "intro" references are common.
pub fn normalize(
    candidate: &Candidate,
    source: &Comment,
    duration_seconds: Option<i64>,
) -> Result<Timecode, NormalizeReject> {
    let offset_seconds = candidate.hours * 3600 + candidate.minutes * 60 + candidate.seconds;

    if let Some(duration) = duration_seconds
        && i64::from(offset_seconds) >= duration
    {
        return Err(NormalizeReject::OutOfRange);
    }

    Ok(Timecode {
        offset_seconds,
        source_comment_id: source.id.clone(),
        context_text: candidate.context.clone(),
        like_count: source.like_count,
    })
}
