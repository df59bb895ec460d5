//! Per-provider request shapes and response mapping.

use reqwest::header::{HeaderName, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ImageError, ImageProvider, ImageResult};
use crate::util::SecretString;

/// Pixabay answers 400 to `per_page` below this.
const PIXABAY_MIN_PER_PAGE: usize = 3;

async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: ImageProvider,
) -> Result<T, ImageError> {
    let response = request
        .send()
        .await
        .map_err(|e| ImageError::transport(&format!("{provider} search failed"), e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(ImageError::Transport(format!(
            "{provider} search error {status}: {error_text}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ImageError::transport(&format!("{provider} search failed"), e))?;

    serde_json::from_str(&body).map_err(|e| ImageError::MalformedResponse {
        provider,
        message: e.to_string(),
    })
}

// ============================================================================
// Unsplash
// ============================================================================

#[derive(Debug, Deserialize)]
struct UnsplashResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    #[serde(default)]
    urls: UnsplashUrls,
    #[serde(default)]
    user: Option<UnsplashUser>,
    #[serde(default)]
    links: Option<UnsplashLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct UnsplashUrls {
    regular: Option<String>,
    full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashLinks {
    html: Option<String>,
}

pub(super) async fn search_unsplash(
    client: &Client,
    endpoint: &str,
    access_key: &SecretString,
    query: &str,
    per_page: usize,
) -> Result<Vec<ImageResult>, ImageError> {
    let per_page = per_page.to_string();
    let request = client
        .get(endpoint)
        .header(HeaderName::from_static("accept-version"), "v1")
        .header(AUTHORIZATION, format!("Client-ID {}", access_key.expose()))
        .query(&[
            ("query", query),
            ("per_page", per_page.as_str()),
            ("orientation", "landscape"),
        ]);

    let response: UnsplashResponse = fetch_json(request, ImageProvider::Unsplash).await?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|photo| {
            Some(ImageResult {
                url: photo.urls.regular.or(photo.urls.full)?,
                author: photo.user.and_then(|u| u.name),
                link: photo.links.and_then(|l| l.html),
                source: ImageProvider::Unsplash,
            })
        })
        .collect())
}

// ============================================================================
// Pexels
// ============================================================================

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    #[serde(default)]
    src: PexelsSrc,
    photographer: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PexelsSrc {
    large2x: Option<String>,
    large: Option<String>,
    original: Option<String>,
}

pub(super) async fn search_pexels(
    client: &Client,
    endpoint: &str,
    api_key: &SecretString,
    query: &str,
    per_page: usize,
) -> Result<Vec<ImageResult>, ImageError> {
    let per_page = per_page.to_string();
    let request = client
        .get(endpoint)
        .header(AUTHORIZATION, api_key.expose())
        .query(&[("query", query), ("per_page", per_page.as_str())]);

    let response: PexelsResponse = fetch_json(request, ImageProvider::Pexels).await?;
    Ok(response
        .photos
        .into_iter()
        .filter_map(|photo| {
            let src = photo.src;
            Some(ImageResult {
                url: src.large2x.or(src.large).or(src.original)?,
                author: photo.photographer,
                link: photo.url,
                source: ImageProvider::Pexels,
            })
        })
        .collect())
}

// ============================================================================
// Pixabay
// ============================================================================

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    user: Option<String>,
    #[serde(rename = "pageURL")]
    page_url: Option<String>,
}

pub(super) async fn search_pixabay(
    client: &Client,
    endpoint: &str,
    api_key: &SecretString,
    query: &str,
    per_page: usize,
) -> Result<Vec<ImageResult>, ImageError> {
    let per_page = per_page.max(PIXABAY_MIN_PER_PAGE).to_string();
    let request = client.get(endpoint).query(&[
        ("key", api_key.expose()),
        ("q", query),
        ("per_page", per_page.as_str()),
        ("image_type", "photo"),
        ("safesearch", "true"),
    ]);

    let response: PixabayResponse = fetch_json(request, ImageProvider::Pixabay).await?;
    Ok(response
        .hits
        .into_iter()
        .filter_map(|hit| {
            Some(ImageResult {
                url: hit.large_image_url.or(hit.webformat_url)?,
                author: hit.user,
                link: hit.page_url,
                source: ImageProvider::Pixabay,
            })
        })
        .collect())
}
