//! Export writers for comment lists, the ranked analysis, and the guide.
//!
//! These are transcriptions of the in-memory structures; all the ranking
//! decisions happen upstream in [`crate::aggregate`] and [`crate::guide`].

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde_json::json;

use crate::aggregate::{ExtractionReport, TimecodedComment};
use crate::comments::Comment;
use crate::guide::{Guide, format_timecode};

/// File formats for the comment exports. The Markdown guide is handled
/// separately because it serializes the [`Guide`], not the comment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
    Json,
    Md,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Md => "md",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "txt" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" => Ok(ExportFormat::Md),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Parses a comma-separated format list, ignoring unknown entries.
pub fn parse_formats(value: &str) -> Vec<ExportFormat> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// Writes the full comment list as `<prefix>.<ext>` for every requested
/// format except `md` (the guide writer owns Markdown output).
pub fn export_comments(
    comments: &[Comment],
    dir: &Path,
    prefix: &str,
    formats: &[ExportFormat],
) -> Result<()> {
    for format in formats {
        let path = dir.join(format!("{prefix}.{}", format.extension()));
        match format {
            ExportFormat::Txt => write_comments_txt(comments, &path)?,
            ExportFormat::Csv => write_comments_csv(comments, &path)?,
            ExportFormat::Json => write_json(comments, &path)?,
            ExportFormat::Md => {}
        }
    }
    Ok(())
}

/// Same as [`export_comments`] but for timecoded comments, which carry the
/// matched timestamp strings alongside the comment fields.
pub fn export_timecoded(
    timecoded: &[TimecodedComment],
    dir: &Path,
    prefix: &str,
    formats: &[ExportFormat],
) -> Result<()> {
    for format in formats {
        let path = dir.join(format!("{prefix}.{}", format.extension()));
        match format {
            ExportFormat::Txt => write_timecoded_txt(timecoded, &path)?,
            ExportFormat::Csv => write_timecoded_csv(timecoded, &path)?,
            ExportFormat::Json => write_json(timecoded, &path)?,
            ExportFormat::Md => {}
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("serializing export JSON")?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn write_comments_txt(comments: &[Comment], path: &Path) -> Result<()> {
    let mut body = String::new();
    for (index, comment) in comments.iter().enumerate() {
        push_comment_block(&mut body, index, comment, None);
    }
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn write_timecoded_txt(timecoded: &[TimecodedComment], path: &Path) -> Result<()> {
    let mut body = String::new();
    for (index, entry) in timecoded.iter().enumerate() {
        push_comment_block(&mut body, index, &entry.comment, Some(entry.timecodes.as_slice()));
    }
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn push_comment_block(
    body: &mut String,
    index: usize,
    comment: &Comment,
    timecodes: Option<&[String]>,
) {
    let _ = write!(
        body,
        "No.: {}\nAuthor: {}\nText: {}\nLikes: {}\nDate: {}\n",
        index + 1,
        comment.author,
        comment.text,
        comment.like_count,
        comment.published_at.as_deref().unwrap_or(""),
    );
    if let Some(timecodes) = timecodes {
        let _ = writeln!(body, "Timecodes: {}", timecodes.join(", "));
    }
    body.push('\n');
}

fn write_comments_csv(comments: &[Comment], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["id", "author", "text", "like_count", "published_at"])?;
    for comment in comments {
        let likes = comment.like_count.to_string();
        writer.write_record([
            comment.id.as_str(),
            comment.author.as_str(),
            comment.text.as_str(),
            likes.as_str(),
            comment.published_at.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush().context("flushing CSV export")?;
    Ok(())
}

fn write_timecoded_csv(timecoded: &[TimecodedComment], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["id", "author", "text", "like_count", "published_at", "timecodes"])?;
    for entry in timecoded {
        let likes = entry.comment.like_count.to_string();
        let timecodes = entry.timecodes.join(", ");
        writer.write_record([
            entry.comment.id.as_str(),
            entry.comment.author.as_str(),
            entry.comment.text.as_str(),
            likes.as_str(),
            entry.comment.published_at.as_deref().unwrap_or(""),
            timecodes.as_str(),
        ])?;
    }
    writer.flush().context("flushing CSV export")?;
    Ok(())
}

/// Writes the ranked cluster analysis as JSON, mirroring the shape the
/// clusters have in memory plus a formatted representative label.
pub fn write_analysis_json(report: &ExtractionReport, path: &Path) -> Result<()> {
    let clusters: Vec<serde_json::Value> = report
        .clusters
        .iter()
        .map(|cluster| {
            json!({
                "representative": format_timecode(cluster.representative_offset_seconds),
                "representative_offset_seconds": cluster.representative_offset_seconds,
                "score": cluster.score,
                "mentions": cluster.members.len(),
                "members": cluster.members,
            })
        })
        .collect();

    let value = json!({
        "most_reliable": clusters.first().cloned(),
        "clusters": clusters,
    });

    let body = serde_json::to_string_pretty(&value).context("serializing timecode analysis")?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

/// Transcribes the guide's three sections into Markdown.
pub fn write_guide_md(guide: &Guide, path: &Path) -> Result<()> {
    let mut body = String::new();
    let _ = writeln!(body, "# Timecode Guide for: {}\n", guide.video_title);

    if guide.context_lines.is_empty() {
        body.push_str("No timecodes found in the comments.\n");
        return fs::write(path, body).with_context(|| format!("writing {}", path.display()));
    }

    body.push_str("## Top Timecodes (by reliability)\n\n");
    for (index, top) in guide.top_timecodes.iter().enumerate() {
        let _ = writeln!(body, "{}. **{}** {}", index + 1, top.label, top.context);
        let _ = writeln!(body, "   - Mentioned in {} comment(s)", top.mentions);
        let _ = writeln!(body, "   - Reliability score: {:.2}\n", top.score);
    }

    body.push_str("## All Timecodes in Context\n\n");
    for line in &guide.context_lines {
        let _ = writeln!(body, "- **{}** {}", line.label, line.context);
    }
    body.push('\n');

    body.push_str("## All Comments with Timecodes\n\n");
    for (index, entry) in guide.comments.iter().enumerate() {
        let author = if entry.comment.author.is_empty() {
            "Anonymous"
        } else {
            entry.comment.author.as_str()
        };
        let _ = writeln!(
            body,
            "### Comment {} by {} ({} likes)\n",
            index + 1,
            author,
            entry.comment.like_count
        );
        let _ = writeln!(body, "{}\n", entry.comment.text);
        let labels: Vec<String> = entry
            .timecodes
            .iter()
            .map(|timecode| format!("**{timecode}**"))
            .collect();
        let _ = writeln!(body, "Timecodes found: {}\n", labels.join(", "));
        body.push_str("---\n\n");
    }

    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::extract;
    use crate::config::ExtractConfig;
    use crate::guide;
    use tempfile::tempdir;

    fn comment(id: &str, text: &str, like_count: i64) -> Comment {
        Comment {
            id: id.to_owned(),
            author: "Viewer".to_owned(),
            text: text.to_owned(),
            like_count,
            published_at: Some("2024-01-01T00:00:00+00:00".to_owned()),
        }
    }

    fn scenario() -> (Vec<Comment>, ExtractionReport) {
        let comments = vec![
            comment("c1", "great moment at 1:23!", 10),
            comment("c2", "yes 1:24 is the best", 0),
            comment("c3", "also check 5:00", 3),
        ];
        let report = extract(&comments, Some(600), &ExtractConfig::default());
        (comments, report)
    }

    #[test]
    fn parse_formats_ignores_unknown_entries() {
        assert_eq!(
            parse_formats("json, md,xlsx,txt"),
            vec![ExportFormat::Json, ExportFormat::Md, ExportFormat::Txt]
        );
        assert!(parse_formats("").is_empty());
    }

    #[test]
    fn exports_comment_files_in_requested_formats() {
        let dir = tempdir().unwrap();
        let (comments, _) = scenario();
        export_comments(
            &comments,
            dir.path(),
            "all_comments",
            &[ExportFormat::Txt, ExportFormat::Csv, ExportFormat::Json, ExportFormat::Md],
        )
        .unwrap();

        let txt = fs::read_to_string(dir.path().join("all_comments.txt")).unwrap();
        assert!(txt.contains("No.: 1"));
        assert!(txt.contains("great moment at 1:23!"));

        let csv_body = fs::read_to_string(dir.path().join("all_comments.csv")).unwrap();
        assert!(csv_body.starts_with("id,author,text,like_count,published_at"));
        assert_eq!(csv_body.lines().count(), 4);

        let parsed: Vec<Comment> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("all_comments.json")).unwrap())
                .unwrap();
        assert_eq!(parsed.len(), 3);

        // md is the guide writer's job, never a comment dump.
        assert!(!dir.path().join("all_comments.md").exists());
    }

    #[test]
    fn exports_timecoded_comments_with_their_matches() {
        let dir = tempdir().unwrap();
        let (_, report) = scenario();
        export_timecoded(
            &report.timecoded_comments,
            dir.path(),
            "timecoded_comments",
            &[ExportFormat::Txt, ExportFormat::Csv],
        )
        .unwrap();

        let txt = fs::read_to_string(dir.path().join("timecoded_comments.txt")).unwrap();
        assert!(txt.contains("Timecodes: 1:23"));

        let csv_body = fs::read_to_string(dir.path().join("timecoded_comments.csv")).unwrap();
        assert!(csv_body.lines().next().unwrap().ends_with(",timecodes"));
        assert!(csv_body.contains("5:00"));
    }

    #[test]
    fn analysis_json_ranks_and_labels_clusters() {
        let dir = tempdir().unwrap();
        let (_, report) = scenario();
        let path = dir.path().join("timecode_analysis.json");
        write_analysis_json(&report, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["most_reliable"]["representative"], "01:23");
        assert_eq!(value["clusters"][0]["mentions"], 2);
        assert_eq!(value["clusters"][1]["representative_offset_seconds"], 300);
    }

    #[test]
    fn guide_markdown_has_three_sections() {
        let dir = tempdir().unwrap();
        let (_, report) = scenario();
        let guide = guide::render("My Video", &report, &ExtractConfig::default());
        let path = dir.path().join("timecode_guide.md");
        write_guide_md(&guide, &path).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Timecode Guide for: My Video"));
        assert!(body.contains("## Top Timecodes (by reliability)"));
        assert!(body.contains("1. **01:23**"));
        assert!(body.contains("## All Timecodes in Context"));
        assert!(body.contains("- **05:00**"));
        assert!(body.contains("## All Comments with Timecodes"));
        assert!(body.contains("### Comment 1 by Viewer (10 likes)"));
    }

    #[test]
    fn empty_guide_is_still_a_valid_document() {
        let dir = tempdir().unwrap();
        let report = extract(&[], None, &ExtractConfig::default());
        let guide = guide::render("Quiet Video", &report, &ExtractConfig::default());
        let path = dir.path().join("timecode_guide.md");
        write_guide_md(&guide, &path).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains("No timecodes found in the comments."));
        assert!(!body.contains("## Top Timecodes"));
    }
}
