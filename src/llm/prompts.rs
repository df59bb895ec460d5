// Prompt templates for article generation

/// System-role instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "Ты — опытный редактор и копирайтер. \
Отвечай строго валидным JSON без пояснений, без markdown-обёрток и без текста до или после JSON.";

/// Build the user-role instruction for one topic.
///
/// `target_chars` adds an explicit length budget for the whole article.
pub fn article_prompt(topic: &str, target_chars: Option<usize>) -> String {
    let limit = match target_chars {
        Some(chars) => format!(" Ограничь общий объём примерно {} символов.", chars),
        None => String::new(),
    };

    format!(
        r#"Сгенерируй статью на русском строго в формате JSON с полями:
{{
  "title": "...",
  "subtitle": "...",
  "slug": "kebab-case",
  "keywords": ["...", "..."],
  "description": "meta description, 140-160 символов",
  "sections": [
    {{"heading": "H2", "content_md": "markdown контент 120-200 слов"}}
  ],
  "image_queries": [
    {{"topic": "кратко, что искать для обложки", "style": "cinematic, vibrant, colorful"}}
  ],
  "sources": [{{"title":"...", "url":"..."}}]
}}

Требования: краткие абзацы, списки, примеры. Не выдумывай факты; если не уверен — пиши общими словами. Тон — экспертно, дружелюбно.{}
Тема: {}
"#,
        limit, topic
    )
}
