use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::util::SecretString;

/// File name looked up in the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "content-bot.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub images: ImagesConfig,
    pub output: OutputConfig,
}

/// Everything the article generator needs. Built once per run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend name, parsed into [`crate::llm::Backend`] when the client is built.
    pub backend: String,
    pub openai: OpenAIConfig,
    pub gigachat: GigaChatConfig,
    /// Approximate character budget of the rendered article body.
    pub target_chars: Option<usize>,
    /// Timeout for chat-completion calls
    pub request_timeout_secs: u64,
    /// Timeout for the OAuth token exchange
    pub token_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: "openai".to_string(),
            openai: OpenAIConfig::default(),
            gigachat: GigaChatConfig::default(),
            target_chars: None,
            request_timeout_secs: 60,
            token_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GigaChatConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Pre-encoded Basic credential; wins over the id/secret pair when set.
    pub basic: Option<SecretString>,
    pub scope: String,
    pub base_url: String,
    pub token_url: String,
    pub model: String,
    pub verify_ssl: bool,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            basic: None,
            scope: "GIGACHAT_API_PERS".to_string(),
            base_url: "https://gigachat.devices.sberbank.ru/api/v1".to_string(),
            token_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string(),
            model: "GigaChat".to_string(),
            verify_ssl: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Provider name, parsed into [`crate::images::ImageProvider`] per search.
    pub provider: String,
    pub unsplash_access_key: Option<SecretString>,
    pub pexels_api_key: Option<SecretString>,
    pub pixabay_api_key: Option<SecretString>,
    pub unsplash_endpoint: String,
    pub pexels_endpoint: String,
    pub pixabay_endpoint: String,
    /// Inline images per article, in addition to the cover
    pub inline_images: usize,
    pub search_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            provider: "unsplash".to_string(),
            unsplash_access_key: None,
            pexels_api_key: None,
            pixabay_api_key: None,
            unsplash_endpoint: "https://api.unsplash.com/search/photos".to_string(),
            pexels_endpoint: "https://api.pexels.com/v1/search".to_string(),
            pixabay_endpoint: "https://pixabay.com/api/".to_string(),
            inline_images: 2,
            search_timeout_secs: 60,
            download_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub content_dir: PathBuf,
    pub articles_per_day: usize,
    /// Pause between two articles
    pub pacing_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            articles_per_day: 10,
            pacing_ms: 500,
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid value for {}: {:?} ({})", key, value, e))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load `.env`, the config file and the process environment, in that order.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(None, None)
    }

    /// Same as [`Config::load`] with explicit config-file and `.env` locations.
    pub fn load_with_paths(config_path: Option<&Path>, env_file: Option<&Path>) -> Result<Self> {
        load_dotenv(env_file)?;
        let mut config = Self::load_file(config_path)?;
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    fn load_file(path: Option<&Path>) -> Result<Self> {
        // An explicit path must exist
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path.display());
            return Self::load_from_path(config_path);
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            debug!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
            return Self::load_from_path(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("content-bot").join("config.toml");
            if config_path.exists() {
                debug!("Loaded config from {:?}", config_path);
                return Self::load_from_path(&config_path);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Overlay environment variables on top of the current values.
    ///
    /// `lookup` abstracts the environment so tests can feed a map. Blank values
    /// count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let generation = &mut self.generation;
        if let Some(v) = get("LLM_PROVIDER") {
            generation.backend = v.to_lowercase();
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            generation.openai.api_key = Some(v.into());
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            generation.openai.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            generation.openai.model = v;
        }
        if let Some(v) = get("GIGACHAT_CLIENT_ID") {
            generation.gigachat.client_id = Some(v);
        }
        if let Some(v) = get("GIGACHAT_CLIENT_SECRET") {
            generation.gigachat.client_secret = Some(v.into());
        }
        if let Some(v) = get("GIGACHAT_BASIC") {
            generation.gigachat.basic = Some(v.into());
        }
        if let Some(v) = get("GIGACHAT_SCOPE") {
            generation.gigachat.scope = v;
        }
        if let Some(v) = get("GIGACHAT_BASE_URL") {
            generation.gigachat.base_url = v;
        }
        if let Some(v) = get("GIGACHAT_TOKEN_URL") {
            generation.gigachat.token_url = v;
        }
        if let Some(v) = get("GIGACHAT_MODEL") {
            generation.gigachat.model = v;
        }
        if let Some(v) = get("GIGACHAT_VERIFY_SSL") {
            generation.gigachat.verify_ssl = parse_flag(&v);
        }
        if let Some(v) = get("TARGET_CHARS") {
            let target: usize = parse_var("TARGET_CHARS", &v)?;
            if target == 0 {
                bail!("TARGET_CHARS must be a positive number");
            }
            generation.target_chars = Some(target);
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECONDS") {
            let secs: u64 = parse_var("REQUEST_TIMEOUT_SECONDS", &v)?;
            generation.request_timeout_secs = secs;
            self.images.search_timeout_secs = secs;
        }
        if let Some(v) = get("TOKEN_TIMEOUT_SECONDS") {
            generation.token_timeout_secs = parse_var("TOKEN_TIMEOUT_SECONDS", &v)?;
        }

        let images = &mut self.images;
        if let Some(v) = get("IMAGE_PROVIDER") {
            images.provider = v.to_lowercase();
        }
        if let Some(v) = get("UNSPLASH_ACCESS_KEY") {
            images.unsplash_access_key = Some(v.into());
        }
        if let Some(v) = get("PEXELS_API_KEY") {
            images.pexels_api_key = Some(v.into());
        }
        if let Some(v) = get("PIXABAY_API_KEY") {
            images.pixabay_api_key = Some(v.into());
        }
        if let Some(v) = get("INLINE_IMAGES") {
            images.inline_images = parse_var("INLINE_IMAGES", &v)?;
        }
        if let Some(v) = get("DOWNLOAD_TIMEOUT_SECONDS") {
            images.download_timeout_secs = parse_var("DOWNLOAD_TIMEOUT_SECONDS", &v)?;
        }

        let output = &mut self.output;
        if let Some(v) = get("CONTENT_BASE_DIR") {
            output.content_dir = PathBuf::from(v);
        }
        if let Some(v) = get("ARTICLES_PER_DAY") {
            output.articles_per_day = parse_var("ARTICLES_PER_DAY", &v)?;
        }

        Ok(())
    }
}

/// Preload variables from a `.env` file without overriding ones already set.
fn load_dotenv(env_file: Option<&Path>) -> Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            debug!("Loaded environment from {}", path.display());
        }
        None => {
            let local = Path::new(".env");
            if local.exists() {
                dotenvy::from_path(local).context("failed to load ./.env")?;
                debug!("Loaded environment from ./.env");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation.backend, "openai");
        assert_eq!(config.generation.openai.model, "gpt-4o-mini");
        assert_eq!(config.generation.gigachat.scope, "GIGACHAT_API_PERS");
        assert!(config.generation.gigachat.verify_ssl);
        assert_eq!(config.images.provider, "unsplash");
        assert_eq!(config.images.inline_images, 2);
        assert_eq!(config.output.articles_per_day, 10);
        assert_eq!(config.output.content_dir, PathBuf::from("content"));
        assert!(config.images.download_timeout_secs > config.images.search_timeout_secs);
        assert!(config.generation.token_timeout_secs > config.generation.request_timeout_secs);
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[
                ("LLM_PROVIDER", "GigaChat"),
                ("GIGACHAT_BASIC", "YWJjOmRlZg=="),
                ("GIGACHAT_VERIFY_SSL", "no"),
                ("IMAGE_PROVIDER", "Pexels"),
                ("PEXELS_API_KEY", "px-key"),
                ("INLINE_IMAGES", "4"),
                ("ARTICLES_PER_DAY", "3"),
                ("REQUEST_TIMEOUT_SECONDS", "15"),
                ("CONTENT_BASE_DIR", "/tmp/site"),
                ("TARGET_CHARS", "3000"),
            ]))
            .unwrap();

        assert_eq!(config.generation.backend, "gigachat");
        assert_eq!(config.generation.gigachat.basic.as_ref().unwrap().expose(), "YWJjOmRlZg==");
        assert!(!config.generation.gigachat.verify_ssl);
        assert_eq!(config.images.provider, "pexels");
        assert_eq!(config.images.inline_images, 4);
        assert_eq!(config.output.articles_per_day, 3);
        assert_eq!(config.generation.request_timeout_secs, 15);
        assert_eq!(config.images.search_timeout_secs, 15);
        assert_eq!(config.output.content_dir, PathBuf::from("/tmp/site"));
        assert_eq!(config.generation.target_chars, Some(3000));
    }

    #[test]
    fn test_apply_env_blank_values_are_unset() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[("OPENAI_API_KEY", "   "), ("OPENAI_MODEL", "")]))
            .unwrap();
        assert!(config.generation.openai.api_key.is_none());
        assert_eq!(config.generation.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_apply_env_invalid_number_names_variable() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup_from(&[("INLINE_IMAGES", "two")]))
            .unwrap_err();
        assert!(err.to_string().contains("INLINE_IMAGES"));
    }

    #[test]
    fn test_apply_env_zero_target_chars_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_env(lookup_from(&[("TARGET_CHARS", "0")]))
            .is_err());
    }

    #[test]
    fn test_verify_ssl_flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content-bot.toml");
        fs::write(
            &path,
            r#"
[generation]
backend = "gigachat"
target_chars = 2500

[generation.gigachat]
client_id = "client"

[images]
provider = "pixabay"
inline_images = 1

[output]
content_dir = "site/content"
pacing_ms = 0
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.generation.backend, "gigachat");
        assert_eq!(config.generation.target_chars, Some(2500));
        assert_eq!(config.generation.gigachat.client_id.as_deref(), Some("client"));
        // untouched keys keep their defaults
        assert_eq!(config.generation.gigachat.scope, "GIGACHAT_API_PERS");
        assert_eq!(config.images.provider, "pixabay");
        assert_eq!(config.images.inline_images, 1);
        assert_eq!(config.output.content_dir, PathBuf::from("site/content"));
        assert_eq!(config.output.pacing_ms, 0);
        assert_eq!(config.output.articles_per_day, 10);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = Config::load_from_path("/nonexistent/content-bot.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_secrets_hidden_in_debug() {
        let mut config = Config::default();
        config.generation.openai.api_key = Some("sk-very-secret".into());
        let dump = format!("{:?}", config);
        assert!(!dump.contains("sk-very-secret"));
    }
}
