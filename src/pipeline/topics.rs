use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Built-in topics used when no topics file is given.
pub const SEED_TOPICS: [&str; 12] = [
    "Тренды ИИ для контент-маркетинга",
    "UX-советы для лендингов 2025",
    "Как написать продающий лид-абзац",
    "SEO: внутренняя перелинковка без боли",
    "Подбор изображений: стоки vs генерация",
    "Структура идеальной статьи 1000 слов",
    "Оформление обложки: принципы и примеры",
    "Как планировать контент на неделю",
    "Проверка фактов: быстрый чек-лист",
    "Как избежать плагиата при генерации",
    "JSON-LD для статей: кратко",
    "Оптимизация alt-текстов для картинок",
];

/// Parse a topics file: one topic per line, `#` starts a comment line.
pub fn parse_topics(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Up to `count` topics, from `topics_file` if it exists, else from [`SEED_TOPICS`].
pub fn load_topics(count: usize, topics_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = topics_file.filter(|p| p.exists()) {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read topics file {}", path.display()))?;
        let mut topics = parse_topics(&content);
        info!("Loaded {} topic(s) from {}", topics.len(), path.display());
        topics.truncate(count);
        return Ok(topics);
    }

    if let Some(path) = topics_file {
        info!("Topics file {} not found, using built-in topics", path.display());
    }
    debug!("Using built-in seed topics");
    Ok(SEED_TOPICS
        .iter()
        .take(count)
        .map(|t| t.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_topics_skips_comments_and_blanks() {
        let topics = parse_topics("# heading\n\n  Первая тема  \n#другой\nВторая\n\n");
        assert_eq!(topics, vec!["Первая тема", "Вторая"]);
    }

    #[test]
    fn test_load_topics_from_file_respects_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topics.txt");
        fs::write(&path, "a\nb\nc\nd\n").unwrap();

        assert_eq!(load_topics(2, Some(&path)).unwrap(), vec!["a", "b"]);
        assert_eq!(load_topics(10, Some(&path)).unwrap().len(), 4);
    }

    #[test]
    fn test_load_topics_seed_list() {
        let topics = load_topics(3, None).unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0], SEED_TOPICS[0]);

        assert_eq!(load_topics(100, None).unwrap().len(), SEED_TOPICS.len());
    }

    #[test]
    fn test_load_topics_missing_file_uses_seed() {
        let topics = load_topics(1, Some(Path::new("/nonexistent/topics.txt"))).unwrap();
        assert_eq!(topics, vec![SEED_TOPICS[0]]);
    }

    #[test]
    fn test_load_topics_zero_count() {
        assert!(load_topics(0, None).unwrap().is_empty());
    }
}
