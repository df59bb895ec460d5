//! Shared utilities for the content-bot codebase

use serde::Deserialize;
use std::fmt;

/// A string wrapper that masks its contents in Debug/Display output.
/// Prevents accidental logging of API keys and other secrets.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Intentionally access the raw secret value (for headers, URLs, etc.)
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<&str> for SecretString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Slug used when nothing in the input survives slugification.
pub const EMPTY_SLUG: &str = "post";

/// Romanization of Cyrillic letters, lowercase only (input is lowercased first).
fn transliterate(ch: char) -> Option<&'static str> {
    let s = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "io",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "iu",
        'я' => "ia",
        'є' => "ie",
        'і' => "i",
        'ї' => "i",
        'ґ' => "g",
        _ => return None,
    };
    Some(s)
}

/// Accumulates slug characters, collapsing separator runs into one hyphen.
struct SlugBuilder {
    slug: String,
    pending_hyphen: bool,
}

impl SlugBuilder {
    fn push_str(&mut self, piece: &str) {
        for c in piece.chars() {
            if c.is_ascii_alphanumeric() {
                if self.pending_hyphen && !self.slug.is_empty() {
                    self.slug.push('-');
                }
                self.pending_hyphen = false;
                self.slug.push(c.to_ascii_lowercase());
            } else {
                self.pending_hyphen = true;
            }
        }
    }

    fn separator(&mut self) {
        self.pending_hyphen = true;
    }
}

/// Turn arbitrary text into a lowercase, hyphen-separated ASCII slug.
///
/// Cyrillic is romanized with a fixed table, any other non-ASCII character goes
/// through `deunicode` ("Café" → "cafe", "日本" → "ri-ben"). ASCII letters and
/// digits are kept and every other run of characters collapses into a single
/// hyphen. Applying it to its own output returns the same string.
pub fn slugify(text: &str) -> String {
    let mut builder = SlugBuilder {
        slug: String::with_capacity(text.len()),
        pending_hyphen: false,
    };

    for ch in text.to_lowercase().chars() {
        if ch.is_ascii() {
            let mut buf = [0u8; 4];
            builder.push_str(ch.encode_utf8(&mut buf));
        } else if let Some(latin) = transliterate(ch) {
            // hard/soft signs vanish without splitting the word
            builder.push_str(latin);
        } else if let Some(latin) = deunicode::deunicode_char(ch) {
            builder.push_str(latin);
        } else {
            builder.separator();
        }
    }

    if builder.slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        builder.slug
    }
}

/// First `max` characters of `text` (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Marker appended to a body that was cut short.
pub const ELLIPSIS: char = '…';

/// Cut `body` down to `target` characters.
///
/// The cut backs off to the last whitespace inside the kept prefix unless that
/// whitespace sits before 60% of the target, then trailing whitespace is removed
/// and [`ELLIPSIS`] appended. Bodies already within the target are returned as is.
pub fn truncate_body(body: &str, target: usize) -> String {
    if body.chars().count() <= target {
        return body.to_string();
    }

    let head = truncate_chars(body, target);
    let cut = head
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .last()
        .filter(|(idx, _)| head[..*idx].chars().count() * 5 >= target * 3)
        .map(|(idx, _)| &head[..idx])
        .unwrap_or(head);

    let mut out = cut.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}
