#![forbid(unsafe_code)]

//! Public entry point for the reusable timecode-tools crate.
//!
//! The crate hosts the comment timecode extraction engine (parser,
//! normalizer, aggregator, guide renderer) plus the export and configuration
//! helpers, so the binary only owns CLI parsing and the yt-dlp plumbing
//! around one video at a time.

pub mod aggregate;
pub mod comments;
pub mod config;
pub mod export;
pub mod guide;
pub mod normalize;
pub mod parser;
