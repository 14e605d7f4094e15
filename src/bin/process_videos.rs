//! Command-line tool that downloads YouTube videos and builds a community
//! timecode guide from their comments.
//!
//! The binary owns every moving piece around the extraction engine: CLI
//! parsing, yt-dlp invocations for metadata/media/comments, the per-video
//! export directory, and the bounded worker pool used for URL list batches.
//! The engine itself (parser, normalizer, aggregator, guide renderer) lives
//! in the library crate and is pure.

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use timecode_tools::aggregate::{self, ExtractionReport};
use timecode_tools::comments::{self, Comment, CommentSortOrder};
use timecode_tools::config::{
    self, DEFAULT_MAX_COMMENTS, DEFAULT_MAX_WORKERS, DEFAULT_MERGE_TOLERANCE_SECONDS,
    DEFAULT_OUTPUT_DIR, DEFAULT_TOP_TIMECODES, EnvConfig, ExtractConfig,
};
use timecode_tools::export::{self, ExportFormat};
use timecode_tools::guide;

/// Extensions checked when deciding whether a video is already on disk.
const KNOWN_MEDIA_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mkv", "m4a"];

/// Number of top timecode labels surfaced in the end-of-run summary.
const SUMMARY_TOP_TIMECODES: usize = 5;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download YouTube videos and build timecode guides from their comments."
)]
#[command(group(ArgGroup::new("input").required(true).args(["video", "file"])))]
struct Cli {
    #[arg(short = 'v', long = "video", value_name = "URL", help = "Single video URL")]
    video: Option<String>,
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        help = "Text file with video URLs (one per line)"
    )]
    file: Option<PathBuf>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Output directory (default ./downloads)"
    )]
    output: Option<PathBuf>,
    #[arg(
        long = "formats",
        value_name = "LIST",
        default_value = "json,md",
        help = "Export formats (comma-separated): txt,csv,json,md"
    )]
    formats: String,
    #[arg(long = "no-video", help = "Skip video download, only process comments")]
    no_video: bool,
    #[arg(
        long = "video-format",
        value_name = "EXT",
        default_value = "mp4",
        help = "Video container format (mp4, webm, ...)"
    )]
    video_format: String,
    #[arg(
        long = "skip-comments",
        conflicts_with = "no_video",
        help = "Skip comments processing, only download video"
    )]
    skip_comments: bool,
    #[arg(
        long = "comments",
        value_name = "N",
        help = "Maximum comments to process per video (default 100)"
    )]
    comments: Option<usize>,
    #[arg(
        long = "sort",
        value_name = "ORDER",
        help = "Comment sort order: relevance or time (default relevance)"
    )]
    sort: Option<CommentSortOrder>,
    #[arg(
        long = "threads",
        value_name = "N",
        help = "Number of parallel workers for batch mode (default 3)"
    )]
    threads: Option<usize>,
    #[arg(
        long = "top",
        value_name = "N",
        help = "Number of entries in the guide's top section (default 5)"
    )]
    top: Option<usize>,
    #[arg(
        long = "tolerance",
        value_name = "SECS",
        help = "Merge tolerance in seconds when clustering timestamps (default 5)"
    )]
    tolerance: Option<u32>,
    #[arg(
        long = "cookies",
        value_name = "PATH",
        help = "Cookies file passed through to yt-dlp"
    )]
    cookies: Option<PathBuf>,
    #[arg(
        long = "config",
        value_name = "PATH",
        help = "Path to the env-style config file (default ~/.config/timecode-tools/env)"
    )]
    config: Option<PathBuf>,
}

/// Fully resolved runtime settings: CLI flags override config file values,
/// which override the built-in defaults.
#[derive(Debug, Clone)]
struct Settings {
    output_dir: PathBuf,
    formats: Vec<ExportFormat>,
    download_video: bool,
    video_format: String,
    skip_comments: bool,
    threads: usize,
    cookies: Option<PathBuf>,
    extract: ExtractConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Error,
}

/// Outcome of one video's pipeline, collected for the end-of-run summary.
/// Failures are captured here instead of propagating so one video can never
/// abort its siblings.
#[derive(Debug, Clone)]
struct ProcessOutcome {
    url: String,
    status: Status,
    message: String,
    title: Option<String>,
    channel: Option<String>,
    total_comments: usize,
    timecoded_comments: usize,
    top_timecodes: Vec<String>,
    download_status: Option<String>,
}

impl ProcessOutcome {
    fn failure(url: &str, message: String) -> Self {
        Self {
            url: url.to_owned(),
            status: Status::Error,
            message,
            title: None,
            channel: None,
            total_comments: 0,
            timecoded_comments: 0,
            top_timecodes: Vec::new(),
            download_status: None,
        }
    }
}

/// Subset of `yt-dlp --dump-single-json` this tool reads. Everything but the
/// id is optional because older videos may lack metadata.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    title: Option<String>,
    fulltitle: Option<String>,
    description: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    ensure_program_available("yt-dlp")?;

    let env_cfg = load_env_config(&cli)?;
    let settings = resolve_settings(&cli, env_cfg);

    fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("creating {}", settings.output_dir.display()))?;

    if let Some(url) = &cli.video {
        let outcome = process_video(url, &settings);
        print_results(&[outcome]);
    } else if let Some(file) = &cli.file {
        let urls = read_url_file(file)?;
        if urls.is_empty() {
            bail!("no URLs found in {}", file.display());
        }
        println!(
            "Processing {} video(s) with {} worker(s)",
            urls.len(),
            settings.threads
        );
        let outcomes = run_batch(&urls, &settings)?;
        print_results(&outcomes);
    }

    Ok(())
}

/// Reads the config file named on the CLI, or the default location. A
/// missing default file is fine; a missing explicit path is a user error.
fn load_env_config(cli: &Cli) -> Result<Option<EnvConfig>> {
    match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            config::read_env_config(path)
        }
        None => match config::default_config_path() {
            Some(path) => config::read_env_config(&path),
            None => Ok(None),
        },
    }
}

fn resolve_settings(cli: &Cli, env_cfg: Option<EnvConfig>) -> Settings {
    let env_cfg = env_cfg.unwrap_or_default();

    let extract = ExtractConfig {
        max_comments: cli
            .comments
            .or(env_cfg.max_comments)
            .unwrap_or(DEFAULT_MAX_COMMENTS),
        sort_order: cli.sort.unwrap_or_default(),
        merge_tolerance_seconds: cli
            .tolerance
            .or(env_cfg.merge_tolerance_seconds)
            .unwrap_or(DEFAULT_MERGE_TOLERANCE_SECONDS),
        top_timecodes: cli
            .top
            .or(env_cfg.top_timecodes)
            .unwrap_or(DEFAULT_TOP_TIMECODES),
    };

    Settings {
        output_dir: cli
            .output
            .clone()
            .or(env_cfg.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        formats: export::parse_formats(&cli.formats),
        download_video: !cli.no_video,
        video_format: cli.video_format.clone(),
        skip_comments: cli.skip_comments,
        threads: cli
            .threads
            .or(env_cfg.max_workers)
            .unwrap_or(DEFAULT_MAX_WORKERS)
            .max(1),
        cookies: cli.cookies.clone().or(env_cfg.cookies_file),
        extract,
    }
}

/// Runs `<name> --version` to fail loudly when yt-dlp is missing.
fn ensure_program_available(name: &str) -> Result<()> {
    let status = Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!("{} is installed but returned a failure status", name),
        Err(err) => bail!("{} is not installed or not in PATH: {}", name, err),
    }
}

/// Reads the URL list for batch mode, skipping blanks and `#` comments.
fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

/// Fans the URL list out over a bounded worker pool. Each worker runs the
/// whole pipeline for one video; outcomes come back in input order.
fn run_batch(urls: &[String], settings: &Settings) -> Result<Vec<ProcessOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads)
        .build()
        .context("building worker pool")?;

    let bar = ProgressBar::new(urls.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} videos")
            .context("building progress bar template")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );

    let outcomes = pool.install(|| {
        urls.par_iter()
            .map(|url| {
                let outcome = process_video(url, settings);
                bar.inc(1);
                outcome
            })
            .collect()
    });

    bar.finish_and_clear();
    Ok(outcomes)
}

/// Error-isolating wrapper around the per-video pipeline.
fn process_video(url: &str, settings: &Settings) -> ProcessOutcome {
    match run_pipeline(url, settings) {
        Ok(outcome) => outcome,
        Err(err) => ProcessOutcome::failure(url, format!("{err:#}")),
    }
}

/// The full pipeline for one video: metadata, optional media download,
/// comment fetch, extraction, and exports into a per-video directory.
fn run_pipeline(url: &str, settings: &Settings) -> Result<ProcessOutcome> {
    let video_id = extract_video_id(url)
        .ok_or_else(|| anyhow!("could not extract a video id from {url}"))?;
    let video_url = format!("https://www.youtube.com/watch?v={video_id}");

    let (info, raw_json) = fetch_video_info(&video_url, settings)?;

    let title = info
        .fulltitle
        .as_deref()
        .or(info.title.as_deref())
        .filter(|t| !t.is_empty())
        .unwrap_or(&video_id)
        .to_owned();
    let mut dir_name = sanitize_filename(&title);
    if dir_name.is_empty() {
        dir_name = video_id.clone();
    }

    let video_dir = settings.output_dir.join(&dir_name);
    fs::create_dir_all(&video_dir)
        .with_context(|| format!("creating {}", video_dir.display()))?;
    cache_video_info(&video_id, &info, &raw_json, &video_dir)?;

    let mut outcome = ProcessOutcome {
        url: url.to_owned(),
        status: Status::Ok,
        message: String::new(),
        title: Some(title.clone()),
        channel: info.channel.clone().or_else(|| info.uploader.clone()),
        total_comments: 0,
        timecoded_comments: 0,
        top_timecodes: Vec::new(),
        download_status: None,
    };

    if settings.download_video {
        outcome.download_status = Some(download_video(
            &video_url,
            &dir_name,
            &video_dir,
            settings,
        ));
    }

    if settings.skip_comments {
        outcome.message = "Video processed (comments skipped)".to_owned();
        return Ok(outcome);
    }

    let mut comment_list = fetch_comments(&video_id, &video_url, &video_dir, settings)?;
    comments::order_and_limit(
        &mut comment_list,
        settings.extract.sort_order,
        settings.extract.max_comments,
    );
    outcome.total_comments = comment_list.len();

    let report = aggregate::extract(&comment_list, info.duration, &settings.extract);
    write_exports(&comment_list, &report, &title, &video_dir, settings)?;

    outcome.timecoded_comments = report.timecoded_comments.len();
    outcome.top_timecodes = report
        .clusters
        .iter()
        .take(SUMMARY_TOP_TIMECODES)
        .map(|cluster| guide::format_timecode(cluster.representative_offset_seconds))
        .collect();
    outcome.message = "Processing completed".to_owned();
    Ok(outcome)
}

/// Writes every requested export artifact for one processed video.
fn write_exports(
    comment_list: &[Comment],
    report: &ExtractionReport,
    title: &str,
    video_dir: &Path,
    settings: &Settings,
) -> Result<()> {
    export::export_comments(comment_list, video_dir, "all_comments", &settings.formats)?;

    if !report.timecoded_comments.is_empty() {
        export::export_timecoded(
            &report.timecoded_comments,
            video_dir,
            "timecoded_comments",
            &settings.formats,
        )?;
        export::write_analysis_json(report, &video_dir.join("timecode_analysis.json"))?;
    }

    if settings.formats.contains(&ExportFormat::Md) {
        let rendered = guide::render(title, report, &settings.extract);
        export::write_guide_md(&rendered, &video_dir.join("timecode_guide.md"))?;
    }

    Ok(())
}

/// Runs `yt-dlp --dump-single-json` and returns the parsed subset plus the
/// raw payload for caching.
fn fetch_video_info(video_url: &str, settings: &Settings) -> Result<(VideoInfo, String)> {
    let mut command = Command::new("yt-dlp");
    command
        .arg("--dump-single-json")
        .arg("--skip-download")
        .arg("--no-warnings")
        .arg("--no-progress")
        .arg(video_url);
    add_cookies(&mut command, settings);

    let output = command
        .output()
        .with_context(|| format!("fetching metadata for {}", video_url))?;

    if !output.status.success() {
        bail!(
            "metadata command failed for {} (status {})",
            video_url,
            output.status
        );
    }

    let raw_json =
        String::from_utf8(output.stdout).context("parsing metadata JSON response as UTF-8")?;
    let info: VideoInfo = serde_json::from_str(&raw_json).context("deserializing metadata JSON")?;
    Ok((info, raw_json))
}

/// Caches the raw metadata next to the exports so re-processing and
/// debugging never need another network round trip.
fn cache_video_info(
    video_id: &str,
    info: &VideoInfo,
    raw_json: &str,
    video_dir: &Path,
) -> Result<()> {
    let info_path = video_dir.join(format!("{video_id}.info.json"));
    fs::write(&info_path, raw_json).with_context(|| format!("writing {}", info_path.display()))?;

    if let Some(description) = &info.description {
        let desc_path = video_dir.join(format!("{video_id}.description"));
        fs::write(&desc_path, description)
            .with_context(|| format!("writing {}", desc_path.display()))?;
    }

    Ok(())
}

/// Downloads the requested container format unless a media file for this
/// video already exists. Returns a human-readable status for the summary;
/// download failures are reported there, never fatal.
fn download_video(video_url: &str, dir_name: &str, video_dir: &Path, settings: &Settings) -> String {
    let already_present = KNOWN_MEDIA_EXTENSIONS
        .iter()
        .any(|ext| video_dir.join(format!("{dir_name}.{ext}")).exists());
    if already_present {
        return format!("SKIPPED (Video already exists: {dir_name})");
    }

    let mut output_path = video_dir.join(dir_name);
    output_path.set_extension("%(ext)s");
    let format_spec = format!(
        "bestvideo[ext={0}]+bestaudio/best[ext={0}]/best",
        settings.video_format
    );

    let mut command = Command::new("yt-dlp");
    command
        .arg("--format")
        .arg(&format_spec)
        .arg("--merge-output-format")
        .arg(&settings.video_format)
        .arg("--output")
        .arg(output_path.to_string_lossy().to_string())
        .arg("--no-overwrites")
        .arg("--continue")
        .arg("--no-warnings")
        .arg("--no-progress")
        .arg(video_url);
    add_cookies(&mut command, settings);

    match command.status() {
        Ok(status) if status.success() => format!("OK (Downloaded: {dir_name})"),
        Ok(status) => format!("ERROR: download exited with status {status}"),
        Err(err) => format!("ERROR: {err}"),
    }
}

/// Downloads every available comment via yt-dlp, writes them to disk, and
/// normalizes them into [`Comment`] records at the boundary.
fn fetch_comments(
    video_id: &str,
    video_url: &str,
    video_dir: &Path,
    settings: &Settings,
) -> Result<Vec<Comment>> {
    let output_pattern = video_dir.join(video_id);
    let mut command = Command::new("yt-dlp");
    command
        .arg("--skip-download")
        .arg("--write-comments")
        .arg("--no-warnings")
        .arg("--no-progress")
        .arg("--force-overwrites")
        .arg("--extractor-args")
        .arg(format!(
            "youtube:comment_sort={}",
            settings.extract.sort_order.extractor_value()
        ))
        .arg("--output")
        .arg(output_pattern.to_string_lossy().to_string())
        .arg(video_url);
    add_cookies(&mut command, settings);

    match command.status() {
        Ok(status) if status.success() => {}
        Ok(status) => {
            eprintln!(
                "  Warning: comment extraction failed for {} (status {})",
                video_id, status
            );
        }
        Err(err) => {
            eprintln!(
                "  Warning: unable to execute comment extraction for {}: {}",
                video_id, err
            );
        }
    }

    let comments_path = video_dir.join(format!("{}.comments.json", video_id));
    if !comments_path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&comments_path)
        .with_context(|| format!("opening {}", comments_path.display()))?;
    let reader = BufReader::new(file);
    let json_value: Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", comments_path.display()))?;

    let comments_array = match json_value {
        Value::Array(array) => array,
        Value::Object(mut map) => match map.remove("comments") {
            Some(Value::Array(array)) => array,
            Some(other) => serde_json::from_value::<Vec<Value>>(other).unwrap_or_default(),
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(comments::from_raw_values(comments_array))
}

fn add_cookies(command: &mut Command, settings: &Settings) {
    if let Some(cookies) = &settings.cookies
        && cookies.exists()
    {
        command
            .arg("--cookies")
            .arg(cookies.to_string_lossy().to_string());
    }
}

/// Pulls the 11-character video id out of the URL forms YouTube uses, or
/// accepts a bare id verbatim.
fn extract_video_id(input: &str) -> Option<String> {
    static BARE_ID: OnceLock<Regex> = OnceLock::new();
    static URL_FORMS: OnceLock<Vec<Regex>> = OnceLock::new();

    let bare = BARE_ID
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("bare id pattern compiles"));
    if bare.is_match(input) {
        return Some(input.to_owned());
    }

    let forms = URL_FORMS.get_or_init(|| {
        [
            r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})",
            r"youtu\.be/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("video id pattern compiles"))
        .collect()
    });

    for form in forms {
        if let Some(caps) = form.captures(input) {
            return Some(caps[1].to_owned());
        }
    }
    None
}

/// Strips the characters that are unsafe in directory and file names.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Prints the end-of-run summary: counts, per-video stats, and errors.
fn print_results(outcomes: &[ProcessOutcome]) {
    let successes: Vec<&ProcessOutcome> = outcomes
        .iter()
        .filter(|o| o.status == Status::Ok)
        .collect();
    let errors: Vec<&ProcessOutcome> = outcomes
        .iter()
        .filter(|o| o.status == Status::Error)
        .collect();

    println!();
    println!("===================================");
    println!("Summary");
    println!("===================================");
    println!("Successfully processed: {}", successes.len());
    println!("Errors: {}", errors.len());

    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for outcome in &errors {
            println!("- {}: {}", outcome.url, outcome.message);
        }
    }

    if !successes.is_empty() {
        println!();
        println!("Processed videos:");
        for outcome in &successes {
            let title = outcome.title.as_deref().unwrap_or("Unknown");
            let channel = outcome.channel.as_deref().unwrap_or("Unknown");
            println!("- {} (by {})", title, channel);
            println!("  - Total comments: {}", outcome.total_comments);
            println!("  - Comments with timecodes: {}", outcome.timecoded_comments);
            if !outcome.top_timecodes.is_empty() {
                println!("  - Top timecodes: {}", outcome.top_timecodes.join(", "));
            }
            if let Some(download_status) = &outcome.download_status {
                println!("  - Download status: {}", download_status);
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::env;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn test_settings(output_dir: &Path) -> Settings {
        Settings {
            output_dir: output_dir.to_path_buf(),
            formats: export::parse_formats("txt,csv,json,md"),
            download_video: false,
            video_format: "mp4".to_owned(),
            skip_comments: false,
            threads: 1,
            cookies: None,
            extract: ExtractConfig::default(),
        }
    }

    fn install_ytdlp_stub(dir: &Path) -> Result<PathBuf> {
        let script_path = dir.join("yt-dlp");
        let script = r#"#!/usr/bin/env bash
set -euo pipefail
prev=""
output=""
for arg in "$@"; do
    if [[ "$prev" == "--output" ]]; then
        output="$arg"
    fi
    prev="$arg"
done
if [[ " $* " == *" --dump-single-json "* ]]; then
cat <<'JSON'
{
  "id": "alpha",
  "fulltitle": "Alpha Title",
  "description": "Sample description",
  "channel": "Channel",
  "uploader": "Channel",
  "duration": 600
}
JSON
exit 0
fi
if [[ " $* " == *" --write-comments "* ]]; then
cat <<'JSON' > "${output}.comments.json"
[
  {"id":"c1","text":"great moment at 1:23!","like_count":10,"timestamp":1700000000},
  {"id":"c2","text":"yes 1:24 is the best","like_count":0,"timestamp":1700000100},
  {"id":"c3","text":"also check 5:00","like_count":3,"timestamp":1700000200},
  {"id":"c1","text":"duplicate"}
]
JSON
exit 0
fi
exit 0
"#;
        fs::write(&script_path, script)?;
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&script_path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms)?;
        }
        Ok(script_path)
    }

    struct PathGuard {
        original: Option<String>,
    }

    impl PathGuard {
        fn set_with_stub(dir: &Path) -> Self {
            let original = env::var("PATH").ok();
            let new_path = if let Some(ref value) = original {
                format!("{}:{}", dir.display(), value)
            } else {
                dir.display().to_string()
            };
            unsafe {
                env::set_var("PATH", new_path);
            }
            Self { original }
        }
    }

    impl Drop for PathGuard {
        fn drop(&mut self) {
            if let Some(ref value) = self.original {
                unsafe {
                    env::set_var("PATH", value);
                }
            }
        }
    }

    #[test]
    fn extract_video_id_handles_all_url_forms() {
        let expected = Some("dQw4w9WgXcQ".to_owned());
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), expected);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=x&v=dQw4w9WgXcQ&t=1"),
            expected
        );
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(extract_video_id("https://example.com/nothing"), None);
        assert_eq!(extract_video_id("tooshort"), None);
    }

    #[test]
    fn sanitize_filename_strips_reserved_characters() {
        assert_eq!(sanitize_filename("A/B: C?"), "AB C");
        assert_eq!(sanitize_filename("plain title"), "plain title");
        assert_eq!(sanitize_filename("<>:\"|?*\\/"), "");
    }

    #[test]
    fn read_url_file_skips_blanks_and_comments() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("urls.txt");
        fs::write(&path, "# header\nhttps://youtu.be/dQw4w9WgXcQ\n\n  \nsecond\n")?;
        let urls = read_url_file(&path)?;
        assert_eq!(urls, vec!["https://youtu.be/dQw4w9WgXcQ", "second"]);
        Ok(())
    }

    #[test]
    fn resolve_settings_prefers_cli_over_config_file() {
        let cli = Cli::parse_from([
            "process_videos",
            "--video",
            "dQw4w9WgXcQ",
            "--comments",
            "50",
        ]);
        let env_cfg = EnvConfig {
            output_dir: Some(PathBuf::from("/from-config")),
            max_comments: Some(250),
            max_workers: Some(8),
            merge_tolerance_seconds: None,
            top_timecodes: Some(2),
            cookies_file: None,
        };
        let settings = resolve_settings(&cli, Some(env_cfg));

        assert_eq!(settings.extract.max_comments, 50);
        assert_eq!(settings.extract.top_timecodes, 2);
        assert_eq!(settings.extract.merge_tolerance_seconds, 5);
        assert_eq!(settings.output_dir, PathBuf::from("/from-config"));
        assert_eq!(settings.threads, 8);
        assert!(settings.download_video);
        assert_eq!(
            settings.formats,
            vec![ExportFormat::Json, ExportFormat::Md]
        );
    }

    #[test]
    fn cli_rejects_no_video_with_skip_comments() {
        let result = Cli::try_parse_from([
            "process_videos",
            "--video",
            "dQw4w9WgXcQ",
            "--no-video",
            "--skip-comments",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn process_video_builds_guide_and_exports() -> Result<()> {
        let temp = tempdir()?;
        let _stub = install_ytdlp_stub(temp.path())?;
        let _guard = PathGuard::set_with_stub(temp.path());

        let output_dir = temp.path().join("out");
        let settings = test_settings(&output_dir);
        let outcome = process_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &settings);

        assert_eq!(outcome.status, Status::Ok, "{}", outcome.message);
        assert_eq!(outcome.title.as_deref(), Some("Alpha Title"));
        assert_eq!(outcome.channel.as_deref(), Some("Channel"));
        assert_eq!(outcome.total_comments, 3);
        assert_eq!(outcome.timecoded_comments, 3);
        assert_eq!(outcome.top_timecodes.first().map(String::as_str), Some("01:23"));

        let video_dir = output_dir.join("Alpha Title");
        assert!(video_dir.join("dQw4w9WgXcQ.info.json").exists());
        assert!(video_dir.join("all_comments.json").exists());
        assert!(video_dir.join("all_comments.csv").exists());
        assert!(video_dir.join("timecoded_comments.txt").exists());
        assert!(video_dir.join("timecode_analysis.json").exists());

        let guide_body = fs::read_to_string(video_dir.join("timecode_guide.md"))?;
        assert!(guide_body.contains("# Timecode Guide for: Alpha Title"));
        assert!(guide_body.contains("**01:23**"));
        assert!(guide_body.contains("**05:00**"));
        Ok(())
    }

    #[test]
    fn process_video_skips_existing_download() -> Result<()> {
        let temp = tempdir()?;
        let _stub = install_ytdlp_stub(temp.path())?;
        let _guard = PathGuard::set_with_stub(temp.path());

        let output_dir = temp.path().join("out");
        let video_dir = output_dir.join("Alpha Title");
        fs::create_dir_all(&video_dir)?;
        fs::write(video_dir.join("Alpha Title.mp4"), "media-bytes")?;

        let mut settings = test_settings(&output_dir);
        settings.download_video = true;
        let outcome = process_video("dQw4w9WgXcQ", &settings);

        assert_eq!(outcome.status, Status::Ok, "{}", outcome.message);
        assert!(
            outcome
                .download_status
                .as_deref()
                .unwrap()
                .starts_with("SKIPPED")
        );
        Ok(())
    }

    #[test]
    fn batch_isolates_failures_per_url() -> Result<()> {
        let temp = tempdir()?;
        let _stub = install_ytdlp_stub(temp.path())?;
        let _guard = PathGuard::set_with_stub(temp.path());

        let output_dir = temp.path().join("out");
        let mut settings = test_settings(&output_dir);
        settings.threads = 2;

        let urls = vec![
            "https://youtu.be/dQw4w9WgXcQ".to_owned(),
            "https://example.com/not-a-video".to_owned(),
        ];
        let outcomes = run_batch(&urls, &settings)?;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, Status::Ok);
        assert_eq!(outcomes[1].status, Status::Error);
        assert!(outcomes[1].message.contains("could not extract"));
        Ok(())
    }

    #[test]
    fn skip_comments_stops_after_download_step() -> Result<()> {
        let temp = tempdir()?;
        let _stub = install_ytdlp_stub(temp.path())?;
        let _guard = PathGuard::set_with_stub(temp.path());

        let output_dir = temp.path().join("out");
        let mut settings = test_settings(&output_dir);
        settings.skip_comments = true;
        let outcome = process_video("dQw4w9WgXcQ", &settings);

        assert_eq!(outcome.status, Status::Ok, "{}", outcome.message);
        assert_eq!(outcome.total_comments, 0);
        let video_dir = output_dir.join("Alpha Title");
        assert!(!video_dir.join("all_comments.json").exists());
        assert!(!video_dir.join("timecode_guide.md").exists());
        Ok(())
    }
}
