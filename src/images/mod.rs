//! Stock-photo search and download.
//!
//! One adapter covers three providers (Unsplash, Pexels, Pixabay). The provider
//! and its credential are resolved on every search, so a misconfigured provider
//! only fails the image step that needed it.

mod providers;

use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::ImagesConfig;
use crate::util::SecretString;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{env_var} is required for provider={provider}")]
    MissingCredentials {
        env_var: &'static str,
        provider: ImageProvider,
    },

    #[error("unknown image provider: {0}")]
    UnknownProvider(String),

    #[error("image transport error: {0}")]
    Transport(String),

    #[error("unexpected {provider} response: {message}")]
    MalformedResponse {
        provider: ImageProvider,
        message: String,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImageError {
    fn transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("{context}: request timed out"))
        } else {
            Self::Transport(format!("{context}: {err}"))
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    Unsplash,
    Pexels,
    Pixabay,
}

impl ImageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageProvider::Unsplash => "unsplash",
            ImageProvider::Pexels => "pexels",
            ImageProvider::Pixabay => "pixabay",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn credential_var(&self) -> &'static str {
        match self {
            ImageProvider::Unsplash => "UNSPLASH_ACCESS_KEY",
            ImageProvider::Pexels => "PEXELS_API_KEY",
            ImageProvider::Pixabay => "PIXABAY_API_KEY",
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageProvider {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unsplash" => Ok(ImageProvider::Unsplash),
            "pexels" => Ok(ImageProvider::Pexels),
            "pixabay" => Ok(ImageProvider::Pixabay),
            other => Err(ImageError::UnknownProvider(other.to_string())),
        }
    }
}

/// One search hit with its attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResult {
    pub url: String,
    pub author: Option<String>,
    pub link: Option<String>,
    pub source: ImageProvider,
}

pub struct ImageSearch {
    config: ImagesConfig,
    search_client: Client,
    download_client: Client,
}

impl ImageSearch {
    pub fn new(config: &ImagesConfig) -> Result<Self, ImageError> {
        let build = |secs: u64| {
            Client::builder()
                .timeout(Duration::from_secs(secs))
                .build()
                .map_err(|e| ImageError::Transport(format!("failed to build HTTP client: {e}")))
        };

        Ok(Self {
            config: config.clone(),
            search_client: build(config.search_timeout_secs)?,
            download_client: build(config.download_timeout_secs)?,
        })
    }

    /// The configured provider, validated.
    pub fn provider(&self) -> Result<ImageProvider, ImageError> {
        ImageProvider::from_str(&self.config.provider)
    }

    pub(crate) fn credential(&self, provider: ImageProvider) -> Result<&SecretString, ImageError> {
        let key = match provider {
            ImageProvider::Unsplash => &self.config.unsplash_access_key,
            ImageProvider::Pexels => &self.config.pexels_api_key,
            ImageProvider::Pixabay => &self.config.pixabay_api_key,
        };
        key.as_ref()
            .filter(|k| !k.is_blank())
            .ok_or(ImageError::MissingCredentials {
                env_var: provider.credential_var(),
                provider,
            })
    }

    /// Up to `per_page` ranked candidates for `query` from the configured provider.
    pub async fn search(&self, query: &str, per_page: usize) -> Result<Vec<ImageResult>, ImageError> {
        let provider = self.provider()?;
        let key = self.credential(provider)?;
        debug!("Searching {} for {:?} (per_page={})", provider, query, per_page);

        let client = &self.search_client;
        let mut results = match provider {
            ImageProvider::Unsplash => {
                providers::search_unsplash(client, &self.config.unsplash_endpoint, key, query, per_page)
                    .await?
            }
            ImageProvider::Pexels => {
                providers::search_pexels(client, &self.config.pexels_endpoint, key, query, per_page)
                    .await?
            }
            ImageProvider::Pixabay => {
                providers::search_pixabay(client, &self.config.pixabay_endpoint, key, query, per_page)
                    .await?
            }
        };
        results.truncate(per_page);
        Ok(results)
    }

    /// Stream `url` into `dest`, creating parent directories and replacing any
    /// existing file. A partial file is removed when the transfer fails.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<(), ImageError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ImageError::io(parent, e))?;
        }

        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::transport("image download failed", e))?;

        if !response.status().is_success() {
            return Err(ImageError::Transport(format!(
                "image download failed with status {}",
                response.status()
            )));
        }

        let result = stream_to_file(response, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }
}

async fn stream_to_file(mut response: reqwest::Response, dest: &Path) -> Result<(), ImageError> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| ImageError::io(dest, e))?;

    let mut written = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ImageError::transport("image download interrupted", e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ImageError::io(dest, e))?;
        written += chunk.len();
    }
    file.flush().await.map_err(|e| ImageError::io(dest, e))?;

    debug!("Wrote {} bytes to {}", written, dest.display());
    Ok(())
}
