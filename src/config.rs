use anyhow::{Context, Result};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::comments::CommentSortOrder;

pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";
pub const DEFAULT_MAX_COMMENTS: usize = 100;
pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_MERGE_TOLERANCE_SECONDS: u32 = 5;
pub const DEFAULT_TOP_TIMECODES: usize = 5;

/// Engine configuration threaded explicitly through the aggregator and the
/// guide renderer. Never ambient state.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub max_comments: usize,
    pub sort_order: CommentSortOrder,
    pub merge_tolerance_seconds: u32,
    pub top_timecodes: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_comments: DEFAULT_MAX_COMMENTS,
            sort_order: CommentSortOrder::default(),
            merge_tolerance_seconds: DEFAULT_MERGE_TOLERANCE_SECONDS,
            top_timecodes: DEFAULT_TOP_TIMECODES,
        }
    }
}

/// Optional defaults loaded from an env-style config file. Every value can
/// still be overridden by a CLI flag.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub output_dir: Option<PathBuf>,
    pub max_comments: Option<usize>,
    pub max_workers: Option<usize>,
    pub merge_tolerance_seconds: Option<u32>,
    pub top_timecodes: Option<usize>,
    pub cookies_file: Option<PathBuf>,
}

/// Default location of the config file, `$HOME/.config/timecode-tools/env`.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("timecode-tools")
            .join("env")
    })
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key {
                "OUTPUT_DIR" => {
                    if !value.is_empty() {
                        cfg.output_dir = Some(PathBuf::from(value));
                    }
                }
                "MAX_COMMENTS" => {
                    let parsed: usize = value
                        .parse()
                        .with_context(|| format!("Parsing MAX_COMMENTS from {}", path.display()))?;
                    cfg.max_comments = Some(parsed);
                }
                "MAX_WORKERS" => {
                    let parsed: usize = value
                        .parse()
                        .with_context(|| format!("Parsing MAX_WORKERS from {}", path.display()))?;
                    cfg.max_workers = Some(parsed);
                }
                "MERGE_TOLERANCE_SECONDS" => {
                    let parsed: u32 = value.parse().with_context(|| {
                        format!("Parsing MERGE_TOLERANCE_SECONDS from {}", path.display())
                    })?;
                    cfg.merge_tolerance_seconds = Some(parsed);
                }
                "TOP_TIMECODES" => {
                    let parsed: usize = value
                        .parse()
                        .with_context(|| format!("Parsing TOP_TIMECODES from {}", path.display()))?;
                    cfg.top_timecodes = Some(parsed);
                }
                "COOKIES_FILE" => {
                    if !value.is_empty() {
                        cfg.cookies_file = Some(PathBuf::from(value));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}
