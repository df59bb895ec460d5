//! Batch driver: topic → payload → images → `index.md`, one topic at a time.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::generator::ArticleGenerator;
use super::normalizer::fallback_payload;
use crate::article::ArticlePayload;
use crate::config::Config;
use crate::images::{ImageError, ImageSearch};
use crate::llm::factory;
use crate::render::{write_markdown, ImageMeta};

/// Candidates requested for the cover; the first usable one wins.
const COVER_PER_PAGE: usize = 3;
const INLINE_PER_PAGE: usize = 1;
const IMAGES_DIR: &str = "images";

/// What a batch produced.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub generated: usize,
    pub articles: Vec<PathBuf>,
}

pub struct Runner {
    /// `None` when no backend could be built; every topic then gets the fallback draft.
    generator: Option<ArticleGenerator>,
    /// `None` disables images entirely.
    images: Option<ImageSearch>,
    content_dir: PathBuf,
    inline_images: usize,
    target_chars: Option<usize>,
    pacing: Duration,
}

impl Runner {
    /// Build the LLM client and image search from `config`.
    ///
    /// Neither failure is fatal: a missing backend means fallback drafts, a
    /// missing image client means articles without images. Dry runs use the mock
    /// backend and skip images so nothing touches the network.
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        let generator = match factory::create_client(&config.generation, dry_run) {
            Ok(client) => Some(
                ArticleGenerator::new(client).with_target_chars(config.generation.target_chars),
            ),
            Err(e) => {
                warn!("LLM backend unavailable: {}", e);
                warn!("Every article in this batch will be a fallback draft");
                None
            }
        };

        let images = if dry_run {
            info!("Dry run: image search disabled");
            None
        } else {
            match ImageSearch::new(&config.images) {
                Ok(search) => Some(search),
                Err(e) => {
                    warn!("Image search unavailable: {}", e);
                    None
                }
            }
        };

        Self::with_parts(config, generator, images)
    }

    /// Assemble a runner from prebuilt parts; settings come from `config`.
    pub fn with_parts(
        config: &Config,
        generator: Option<ArticleGenerator>,
        images: Option<ImageSearch>,
    ) -> Self {
        Self {
            generator,
            images,
            content_dir: config.output.content_dir.clone(),
            inline_images: config.images.inline_images,
            target_chars: config.generation.target_chars,
            pacing: Duration::from_millis(config.output.pacing_ms),
        }
    }

    /// Process every topic in order. Failures are per topic and never abort the batch.
    pub async fn run(&self, topics: &[String], date: NaiveDate) -> BatchSummary {
        let day_dir = self.content_dir.join(date.format("%Y-%m-%d").to_string());
        let mut summary = BatchSummary::default();
        let mut claimed = HashSet::new();

        for (i, topic) in topics.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, topics.len(), topic);

            match self.process(topic, &day_dir, &mut claimed).await {
                Ok(path) => {
                    info!("  Wrote {}", path.display());
                    summary.generated += 1;
                    summary.articles.push(path);
                }
                Err(e) => warn!("  Failed to write article: {:#}", e),
            }

            if i + 1 < topics.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        summary
    }

    async fn process(
        &self,
        topic: &str,
        day_dir: &Path,
        claimed: &mut HashSet<PathBuf>,
    ) -> Result<PathBuf> {
        let payload = match &self.generator {
            Some(generator) => generator.generate_or_fallback(topic).await,
            None => fallback_payload(topic),
        };

        let article_dir = claim_article_dir(day_dir, &payload.slug, claimed);
        clear_images(&article_dir).await?;
        let images = self.collect_images(&payload, topic, &article_dir).await;
        write_markdown(&payload, &images, &article_dir, self.target_chars)
    }

    /// Cover plus inline images. Best effort: failures are logged and skipped.
    async fn collect_images(
        &self,
        payload: &ArticlePayload,
        topic: &str,
        article_dir: &Path,
    ) -> Vec<ImageMeta> {
        let Some(search) = &self.images else {
            return Vec::new();
        };
        let mut images = Vec::new();

        let cover_query = payload.cover_query(topic);
        match fetch_image(search, cover_query, COVER_PER_PAGE, article_dir, "cover.jpg", "cover")
            .await
        {
            Ok(Some(meta)) => images.push(meta),
            Ok(None) => info!("  No cover image found for {:?}", cover_query),
            Err(e) => warn!("  Cover image skipped: {}", e),
        }

        for (i, query) in payload
            .inline_queries(topic, self.inline_images)
            .into_iter()
            .enumerate()
        {
            let n = i + 1;
            let file_name = format!("img{n}.jpg");
            let role = format!("inline{n}");
            match fetch_image(search, query, INLINE_PER_PAGE, article_dir, &file_name, &role).await {
                Ok(Some(meta)) => images.push(meta),
                Ok(None) => debug!("  No image found for {:?}", query),
                Err(e) => warn!("  Inline image {} skipped: {}", n, e),
            }
        }

        images
    }
}

/// `day_dir/slug`, or `day_dir/slug-2`, `-3`, ... when an earlier topic of this
/// batch already took it.
fn claim_article_dir(day_dir: &Path, slug: &str, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let mut dir = day_dir.join(slug);
    let mut n = 2;
    while claimed.contains(&dir) {
        dir = day_dir.join(format!("{slug}-{n}"));
        n += 1;
    }
    if dir != day_dir.join(slug) {
        warn!("  Slug {:?} already used in this batch, writing to {}", slug, dir.display());
    }
    claimed.insert(dir.clone());
    dir
}

/// Drop images left by an earlier run so the directory matches the new frontmatter.
async fn clear_images(article_dir: &Path) -> Result<()> {
    let images_dir = article_dir.join(IMAGES_DIR);
    match tokio::fs::remove_dir_all(&images_dir).await {
        Ok(()) => {
            debug!("  Removed stale {}", images_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to clear {}", images_dir.display())),
    }
}

/// Search, then download the first hit to `article_dir/images/file_name`.
async fn fetch_image(
    search: &ImageSearch,
    query: &str,
    per_page: usize,
    article_dir: &Path,
    file_name: &str,
    role: &str,
) -> Result<Option<ImageMeta>, ImageError> {
    let Some(hit) = search.search(query, per_page).await?.into_iter().next() else {
        return Ok(None);
    };

    let dest = article_dir.join(IMAGES_DIR).join(file_name);
    search.download(&hit.url, &dest).await?;

    Ok(Some(ImageMeta {
        role: role.to_string(),
        file: format!("{IMAGES_DIR}/{file_name}"),
        author: hit.author,
        link: hit.link,
        source: hit.source.to_string(),
    }))
}
