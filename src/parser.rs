//! Timestamp candidate extraction from one comment body.
//!
//! Scanning is a pure, single left-to-right pass. Matches are greedy: at any
//! position the longer `H:MM:SS` form wins over `M:SS`, and once a span is
//! consumed scanning resumes after it, so `1:02:03:04` yields exactly one
//! candidate (`1:02:03`). A lone run of digits without a colon is never a
//! timestamp.

use std::sync::OnceLock;

use regex::Regex;

/// Characters of surrounding text captured on each side of a match.
const CONTEXT_CHARS: usize = 40;

/// Leading group of 1-2 digits, then a two-digit group, then an optional
/// two-digit group. Component range checks (<= 59) happen after the match.
fn timecode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").expect("timecode pattern compiles")
    })
}

/// An unvalidated timestamp-like match found in a comment body.
///
/// Candidates live only for the duration of one comment's processing; the
/// normalizer either promotes them to timecodes or drops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Hour component, zero when the match had no hour group.
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    /// Byte offset of the match inside the comment text.
    pub start: usize,
    /// The matched text exactly as it appeared, e.g. `1:23`.
    pub matched: String,
    /// Up to [`CONTEXT_CHARS`] characters either side of the match, clipped
    /// at the comment boundaries, whitespace collapsed to single spaces.
    pub context: String,
}

/// Scans `text` for timestamp candidates, left to right.
///
/// Syntactically valid matches whose minute or second component exceeds 59
/// (e.g. `12:75`) are rejected here, not later; their span still counts as
/// consumed.
pub fn scan(text: &str) -> impl Iterator<Item = Candidate> + '_ {
    timecode_pattern().captures_iter(text).filter_map(|caps| {
        let matched = caps.get(0).expect("match group always present");

        // With three groups the leading one is hours; with two it is minutes.
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let (hours, minutes, seconds) = match caps.get(3) {
            Some(third) => (first, second, third.as_str().parse().ok()?),
            None => (0, first, second),
        };

        if minutes > 59 || seconds > 59 {
            return None;
        }

        Some(Candidate {
            hours,
            minutes,
            seconds,
            start: matched.start(),
            matched: matched.as_str().to_owned(),
            context: context_window(text, matched.start(), matched.end()),
        })
    })
}

/// Extracts the context window around a match and collapses whitespace runs.
fn context_window(text: &str, match_start: usize, match_end: usize) -> String {
    let mut window_start = match_start;
    for (count, (idx, _)) in text[..match_start].char_indices().rev().enumerate() {
        window_start = idx;
        if count + 1 == CONTEXT_CHARS {
            break;
        }
    }

    let window_end = text[match_end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(idx, _)| match_end + idx)
        .unwrap_or(text.len());

    let window = &text[window_start..window_end];
    window.split_whitespace().collect::<Vec<_>>().join(" ")
}
