use anyhow::Result;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use content_bot::cli;
use content_bot::cli::generate::GenerateArgs;

#[derive(Parser)]
#[command(name = "content-bot", version)]
#[command(about = "Generate illustrated Markdown articles with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate articles with images into CONTENT_DIR/DATE/SLUG
    Generate {
        /// How many articles to generate (default: ARTICLES_PER_DAY)
        #[arg(long)]
        count: Option<usize>,

        /// File with one topic per line; built-in topics are used if absent
        #[arg(long)]
        topics_file: Option<PathBuf>,

        /// Base content directory (default: CONTENT_BASE_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Date subdirectory, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<String>,

        /// Image provider override
        #[arg(long, value_parser = ["unsplash", "pexels", "pixabay"])]
        provider: Option<String>,

        /// Inline images per article, besides the cover
        #[arg(long)]
        inline_images: Option<usize>,

        /// LLM backend override
        #[arg(long, value_parser = ["openai", "gigachat"])]
        backend: Option<String>,

        /// Approximate body length in characters; longer bodies are cut
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        target_chars: Option<usize>,

        /// Path to config file (defaults to ./content-bot.toml or ~/.config/content-bot/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Load environment variables from this file instead of ./.env
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Use a canned article and skip images; no network access
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and credentials
    Check {
        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Load environment variables from this file instead of ./.env
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            count,
            topics_file,
            output_dir,
            date,
            provider,
            inline_images,
            backend,
            target_chars,
            config,
            env_file,
            dry_run,
        } => {
            cli::generate::run(GenerateArgs {
                count,
                topics_file,
                output_dir,
                date,
                provider,
                inline_images,
                backend,
                target_chars,
                config,
                env_file,
                dry_run,
            })
            .await?;
        }
        Commands::Check { config, env_file } => {
            cli::config_check::run(config, env_file)?;
        }
    }

    Ok(())
}
