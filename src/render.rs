//! Markdown rendering: YAML frontmatter plus one `##` block per section.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::article::{ArticlePayload, Source};
use crate::util::truncate_body;

/// File written inside each article directory.
pub const INDEX_FILE: &str = "index.md";

/// A downloaded image as listed in the frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMeta {
    /// `cover`, `inline1`, `inline2`, ...
    pub role: String,
    /// Path relative to the article directory.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub source: String,
}

#[derive(Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    subtitle: &'a str,
    date: String,
    description: &'a str,
    keywords: &'a [String],
    sources: &'a [Source],
    #[serde(skip_serializing_if = "no_images")]
    images: &'a [ImageMeta],
}

fn no_images(images: &&[ImageMeta]) -> bool {
    images.is_empty()
}

/// The article body: sections as `## heading` blocks separated by blank lines.
pub fn render_body(payload: &ArticlePayload) -> String {
    payload
        .sections
        .iter()
        .map(|s| format!("## {}\n\n{}", s.heading.trim_end(), s.body.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the full document. Pure: the timestamp is an argument.
pub fn render_markdown(
    payload: &ArticlePayload,
    images: &[ImageMeta],
    target_chars: Option<usize>,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let frontmatter = Frontmatter {
        title: &payload.title,
        subtitle: &payload.subtitle,
        date: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        description: &payload.description,
        keywords: &payload.keywords,
        sources: &payload.sources,
        images,
    };
    let yaml = serde_yaml::to_string(&frontmatter).context("failed to serialize frontmatter")?;

    let mut body = render_body(payload);
    if let Some(target) = target_chars {
        body = truncate_body(&body, target);
    }

    Ok(format!("---\n{yaml}---\n\n{body}\n"))
}

/// Render `payload` and write it to `out_dir/index.md`, creating `out_dir`.
pub fn write_markdown(
    payload: &ArticlePayload,
    images: &[ImageMeta],
    out_dir: &Path,
    target_chars: Option<usize>,
) -> Result<PathBuf> {
    let document = render_markdown(payload, images, target_chars, Utc::now())?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(INDEX_FILE);
    fs::write(&path, document).with_context(|| format!("failed to write {}", path.display()))?;

    debug!("Wrote {}", path.display());
    Ok(path)
}
