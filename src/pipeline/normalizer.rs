//! Turns raw model output into an [`ArticlePayload`], and builds the fallback
//! draft when that is not possible.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::article::{ArticlePayload, ImageQuery, Section};
use crate::llm::GenerationError;
use crate::util::{slugify, truncate_chars};

/// Maximum title length, in characters, derived from a topic.
pub const MAX_TITLE_CHARS: usize = 80;

/// Greedy: first `{` through last `}`.
static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Return the first-`{`-to-last-`}` span of `text`, if there is one.
pub fn extract_json_span(text: &str) -> Option<&str> {
    JSON_SPAN.find(text).map(|m| m.as_str())
}

/// Parse model output as an article payload.
///
/// Strict parse first; if that fails, parse the `{...}` span found in the text;
/// if that fails too, the response is malformed.
pub fn parse_payload(text: &str) -> Result<ArticlePayload, GenerationError> {
    let strict_err = match serde_json::from_str::<ArticlePayload>(text.trim()) {
        Ok(payload) => return Ok(payload),
        Err(e) => e,
    };
    debug!("Strict JSON parse failed ({}), trying to repair", strict_err);

    let span = extract_json_span(text).ok_or_else(|| {
        GenerationError::MalformedResponse(format!("no JSON object in response: {strict_err}"))
    })?;

    serde_json::from_str::<ArticlePayload>(span).map_err(|e| {
        GenerationError::MalformedResponse(format!("JSON repair failed: {e}"))
    })
}

/// Fill the gaps models leave behind and enforce payload invariants.
///
/// - empty title → topic (truncated)
/// - slug → slugified LLM slug, or slugified title
/// - no sections → malformed
pub fn normalize(mut payload: ArticlePayload, topic: &str) -> Result<ArticlePayload, GenerationError> {
    payload.sections.retain(|s| !s.heading.trim().is_empty() || !s.body.trim().is_empty());
    if payload.sections.is_empty() {
        return Err(GenerationError::MalformedResponse(
            "article has no sections".to_string(),
        ));
    }

    if payload.title.trim().is_empty() {
        warn!("Model returned no title, using the topic");
        payload.title = truncate_chars(topic.trim(), MAX_TITLE_CHARS).to_string();
    }

    payload.slug = if payload.slug.trim().is_empty() {
        slugify(&payload.title)
    } else {
        slugify(&payload.slug)
    };

    payload.keywords.retain(|k| !k.trim().is_empty());
    Ok(payload)
}

/// Deterministic stand-in article for a topic whose generation failed.
///
/// Never fails; depends on nothing but `topic`.
pub fn fallback_payload(topic: &str) -> ArticlePayload {
    let title = truncate_chars(topic.trim(), MAX_TITLE_CHARS).to_string();
    let slug = slugify(&title);

    ArticlePayload {
        title,
        subtitle: "Черновик статьи".to_string(),
        slug,
        keywords: vec!["черновик".to_string(), "статья".to_string()],
        description: "Автоматически сгенерированный черновик статьи.".to_string(),
        sections: vec![
            Section {
                heading: "Введение".to_string(),
                body: "Черновик создан автоматически, так как основной провайдер контента \
                       недоступен. Проверьте ключи API LLM и перезапустите генерацию."
                    .to_string(),
            },
            Section {
                heading: "Основные идеи".to_string(),
                body: "Опишите ключевые тезисы по теме и добавьте примеры.".to_string(),
            },
            Section {
                heading: "Выводы".to_string(),
                body: "Сформулируйте краткие выводы и список действий.".to_string(),
            },
        ],
        image_queries: vec![ImageQuery {
            topic: topic.to_string(),
            style: "vibrant, cinematic".to_string(),
        }],
        sources: Vec::new(),
    }
}
