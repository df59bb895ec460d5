use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::images::ImageProvider;
use crate::llm::client_impl::basic_credential;
use crate::llm::Backend;

/// Above this many inline images per article the provider quota drains fast.
const MAX_SENSIBLE_INLINE_IMAGES: usize = 6;

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

pub fn run(config_path: Option<PathBuf>, env_file: Option<PathBuf>) -> Result<()> {
    let mut results = CheckResult::new();

    let config = match Config::load_with_paths(config_path.as_deref(), env_file.as_deref()) {
        Ok(config) => {
            let source = config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "default search path".to_string());
            results.pass(format!("Config loaded from {}", source));
            config
        }
        Err(e) => {
            results.error(format!("Failed to load config: {:#}", e));
            print_results(&results);
            anyhow::bail!("config could not be loaded");
        }
    };

    check_backend(&config, &mut results);
    check_images(&config, &mut results);
    check_settings(&config, &mut results);

    print_results(&results);

    if !results.errors.is_empty() {
        anyhow::bail!("{} config error(s) found", results.errors.len());
    }
    Ok(())
}

fn check_backend(config: &Config, results: &mut CheckResult) {
    let generation = &config.generation;
    let backend = match Backend::from_str(&generation.backend) {
        Ok(backend) => backend,
        Err(e) => {
            results.error(format!("{} (expected openai or gigachat)", e));
            return;
        }
    };

    match backend {
        Backend::OpenAI => {
            results.pass(format!(
                "LLM backend: openai (model: {}, base_url: {})",
                generation.openai.model, generation.openai.base_url
            ));
            match generation.openai.api_key {
                Some(ref key) if !key.is_blank() => results.pass("OPENAI_API_KEY is set"),
                _ => results.error("OPENAI_API_KEY is not set; every article would be a fallback draft"),
            }
        }
        Backend::GigaChat => {
            let gigachat = &generation.gigachat;
            results.pass(format!(
                "LLM backend: gigachat (model: {}, scope: {})",
                gigachat.model, gigachat.scope
            ));
            match basic_credential(gigachat) {
                Ok(_) if gigachat.basic.as_ref().is_some_and(|b| !b.is_blank()) => {
                    results.pass("GigaChat credential: GIGACHAT_BASIC")
                }
                Ok(_) => results.pass("GigaChat credential: client id + secret"),
                Err(e) => results.error(format!(
                    "{}; every article would be a fallback draft",
                    e
                )),
            }
            if !gigachat.verify_ssl {
                results.warn("GIGACHAT_VERIFY_SSL is off: TLS certificates are not verified");
            }
        }
    }
}

fn check_images(config: &Config, results: &mut CheckResult) {
    let images = &config.images;
    let provider = match ImageProvider::from_str(&images.provider) {
        Ok(provider) => provider,
        Err(e) => {
            results.error(format!("{} (expected unsplash, pexels or pixabay)", e));
            return;
        }
    };
    results.pass(format!("Image provider: {}", provider));

    let key = match provider {
        ImageProvider::Unsplash => &images.unsplash_access_key,
        ImageProvider::Pexels => &images.pexels_api_key,
        ImageProvider::Pixabay => &images.pixabay_api_key,
    };
    match key {
        Some(k) if !k.is_blank() => results.pass(format!("{} is set", provider.credential_var())),
        _ => results.warn(format!(
            "{} is not set; articles will be written without images",
            provider.credential_var()
        )),
    }
}

fn check_settings(config: &Config, results: &mut CheckResult) {
    if config.output.articles_per_day == 0 {
        results.error("ARTICLES_PER_DAY is 0; nothing would be generated without --count");
    } else {
        results.pass(format!("Articles per run: {}", config.output.articles_per_day));
    }

    let inline = config.images.inline_images;
    if inline > MAX_SENSIBLE_INLINE_IMAGES {
        results.warn(format!(
            "INLINE_IMAGES = {} (each image is a separate search request)",
            inline
        ));
    } else {
        results.pass(format!("Inline images per article: {}", inline));
    }

    for (name, secs) in [
        ("REQUEST_TIMEOUT_SECONDS", config.generation.request_timeout_secs),
        ("TOKEN_TIMEOUT_SECONDS", config.generation.token_timeout_secs),
        ("DOWNLOAD_TIMEOUT_SECONDS", config.images.download_timeout_secs),
    ] {
        if secs == 0 {
            results.error(format!("{} is 0; every request would time out", name));
        }
    }

    if let Some(target) = config.generation.target_chars {
        results.pass(format!("Target length: {} characters", target));
    }

    let dir = &config.output.content_dir;
    if dir.is_dir() {
        results.pass(format!("Content directory: {}", dir.display()));
    } else if dir.exists() {
        results.error(format!("Content directory {} is not a directory", dir.display()));
    } else {
        results.warn(format!(
            "Content directory {} does not exist yet; it will be created",
            dir.display()
        ));
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}
