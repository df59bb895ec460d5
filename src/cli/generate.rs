use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::pipeline::runner::Runner;
use crate::pipeline::topics::load_topics;

/// Flags of `content-bot generate`. `None` keeps the configured value.
#[derive(Debug, Default, Clone)]
pub struct GenerateArgs {
    pub count: Option<usize>,
    pub topics_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub date: Option<String>,
    pub provider: Option<String>,
    pub inline_images: Option<usize>,
    pub backend: Option<String>,
    pub target_chars: Option<usize>,
    pub config: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub dry_run: bool,
}

/// Parse `--date`, or today's UTC date when absent.
pub fn resolve_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid --date {:?}, expected YYYY-MM-DD", s)),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Replace configured values with the flags that were given.
pub fn apply_overrides(config: &mut Config, args: &GenerateArgs) {
    if let Some(ref dir) = args.output_dir {
        info!("CLI override: output_dir = {}", dir.display());
        config.output.content_dir = dir.clone();
    }
    if let Some(ref provider) = args.provider {
        info!("CLI override: image provider = {}", provider);
        config.images.provider = provider.to_lowercase();
    }
    if let Some(n) = args.inline_images {
        info!("CLI override: inline_images = {}", n);
        config.images.inline_images = n;
    }
    if let Some(ref backend) = args.backend {
        info!("CLI override: backend = {}", backend);
        config.generation.backend = backend.to_lowercase();
    }
    if let Some(n) = args.target_chars {
        info!("CLI override: target_chars = {}", n);
        config.generation.target_chars = Some(n);
    }
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    let mut config = Config::load_with_paths(args.config.as_deref(), args.env_file.as_deref())?;
    apply_overrides(&mut config, &args);

    let date = resolve_date(args.date.as_deref())?;
    let count = args.count.unwrap_or(config.output.articles_per_day);

    info!("Output: {}", config.output.content_dir.display());
    info!("Date: {}", date);
    info!("Backend: {}", config.generation.backend);
    info!("Image provider: {}", config.images.provider);
    info!("Dry run: {}", args.dry_run);

    let topics = load_topics(count, args.topics_file.as_deref())?;
    if topics.is_empty() {
        bail!("No topics found");
    }

    let runner = Runner::from_config(&config, args.dry_run);
    let summary = runner.run(&topics, date).await;

    if summary.generated == 0 {
        bail!("No articles were generated");
    }

    println!("Done. Generated {} article(s).", summary.generated);
    Ok(())
}
