//! Clustering and reliability ranking of normalized timecodes.
//!
//! The aggregator consumes the full ordered comment list in one forward
//! pass, folding each accepted timecode into the nearest existing cluster
//! within the merge tolerance or opening a new one. There is no
//! re-partitioning pass afterwards, so cluster assignment is path-dependent
//! on comment order; this mirrors the observed ranking behavior and is a
//! documented limitation, not a defect. The policy is private to
//! [`Aggregator`] so an order-independent strategy (e.g. sort-then-merge)
//! could replace it without touching the parser, normalizer, or renderer.

use serde::Serialize;

use crate::comments::Comment;
use crate::config::ExtractConfig;
use crate::normalize::{self, Timecode};
use crate::parser;

/// A set of timecodes judged to reference the same video moment.
///
/// `members` preserves insertion order for reproducibility. `score` is
/// derived from the members and recomputed whenever membership changes;
/// it is never meaningful independently of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimecodeCluster {
    pub representative_offset_seconds: u32,
    pub members: Vec<Timecode>,
    pub score: f64,
}

impl TimecodeCluster {
    fn new(first: Timecode) -> Self {
        let mut cluster = Self {
            representative_offset_seconds: first.offset_seconds,
            members: vec![first],
            score: 0.0,
        };
        cluster.refresh();
        cluster
    }

    fn push(&mut self, timecode: Timecode) {
        self.members.push(timecode);
        self.refresh();
    }

    /// Recomputes the representative offset and the score from the members.
    ///
    /// The representative is the median of all member offsets rounded down,
    /// not the mean, so one mis-typed timestamp cannot drag the cluster.
    /// The score is `memberCount + sum(ln(1 + likes))`: independent mention
    /// frequency is the primary signal, likes a log-damped boost.
    fn refresh(&mut self) {
        let mut offsets: Vec<u32> = self.members.iter().map(|m| m.offset_seconds).collect();
        offsets.sort_unstable();
        let mid = offsets.len() / 2;
        self.representative_offset_seconds = if offsets.len() % 2 == 1 {
            offsets[mid]
        } else {
            (offsets[mid - 1] + offsets[mid]) / 2
        };

        self.score = self.members.len() as f64
            + self
                .members
                .iter()
                .map(|m| (1.0 + m.like_count as f64).ln())
                .sum::<f64>();
    }
}

/// A comment that produced at least one accepted timecode, together with the
/// matched timestamp strings in occurrence order. Used by the guide's last
/// section and by the `timecoded_comments` exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimecodedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub timecodes: Vec<String>,
}

/// Result of one aggregation pass: clusters ranked by reliability plus the
/// contributing comments in fetch order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub clusters: Vec<TimecodeCluster>,
    pub timecoded_comments: Vec<TimecodedComment>,
}

/// Incremental cluster builder. Feed comments in fetch order via
/// [`Aggregator::consume`], then call [`Aggregator::finish`] once to rank.
pub struct Aggregator {
    tolerance_seconds: u32,
    clusters: Vec<TimecodeCluster>,
    timecoded: Vec<TimecodedComment>,
}

impl Aggregator {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            tolerance_seconds: config.merge_tolerance_seconds,
            clusters: Vec::new(),
            timecoded: Vec::new(),
        }
    }

    /// Runs parser and normalizer over one comment and folds every accepted
    /// timecode into the cluster set. A comment yielding zero candidates
    /// contributes nothing; that is expected, not an error.
    pub fn consume(&mut self, comment: &Comment, duration_seconds: Option<i64>) {
        let mut matched = Vec::new();

        for candidate in parser::scan(&comment.text) {
            let Ok(timecode) = normalize::normalize(&candidate, comment, duration_seconds) else {
                continue;
            };
            matched.push(candidate.matched);
            self.place(timecode);
        }

        if !matched.is_empty() {
            self.timecoded.push(TimecodedComment {
                comment: comment.clone(),
                timecodes: matched,
            });
        }
    }

    /// Merges a timecode into the nearest cluster within tolerance, or opens
    /// a new cluster. Distance ties go to the earliest-created cluster.
    fn place(&mut self, timecode: Timecode) {
        let mut best: Option<(usize, u32)> = None;
        for (index, cluster) in self.clusters.iter().enumerate() {
            let distance = cluster
                .representative_offset_seconds
                .abs_diff(timecode.offset_seconds);
            if distance > self.tolerance_seconds {
                continue;
            }
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }

        match best {
            Some((index, _)) => self.clusters[index].push(timecode),
            None => self.clusters.push(TimecodeCluster::new(timecode)),
        }
    }

    /// Finalizes the pass: clusters ordered by descending score, ties broken
    /// by ascending representative offset, then first-seen order (the sort
    /// is stable and clusters are held in creation order).
    pub fn finish(mut self) -> ExtractionReport {
        self.clusters.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| {
                    a.representative_offset_seconds
                        .cmp(&b.representative_offset_seconds)
                })
        });

        ExtractionReport {
            clusters: self.clusters,
            timecoded_comments: self.timecoded,
        }
    }
}

/// Convenience wrapper: one full pass over an ordered comment slice.
pub fn extract(
    comments: &[Comment],
    duration_seconds: Option<i64>,
    config: &ExtractConfig,
) -> ExtractionReport {
    let mut aggregator = Aggregator::new(config);
    for comment in comments {
        aggregator.consume(comment, duration_seconds);
    }
    aggregator.finish()
}
