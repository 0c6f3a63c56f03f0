//! Heading slug generation

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("valid separator regex"))
}

/// Convert heading text to an ASCII anchor id
///
/// Rules:
/// - Lowercase
/// - Whitespace, underscores and hyphens become one hyphen
/// - Anything that is not an ASCII letter or digit is dropped
/// - Leading and trailing hyphens are trimmed
/// - A leading digit gets an underscore prefix
///
/// # Examples
///
/// ```
/// use mdc_editor::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("C++ & Rust"), "c-rust");
/// assert_eq!(slugify("2024 Roadmap"), "_2024-roadmap");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned: String = input
        .to_lowercase()
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_whitespace() || c == '_' || c == '-' {
                Some('-')
            } else if c.is_ascii_alphanumeric() && g.len() == 1 {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    let collapsed = separator_re().replace_all(&cleaned, "-");
    let slug = collapsed.trim_matches('-');

    if slug.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{slug}")
    } else {
        slug.to_string()
    }
}

/// Slugs issued during one conversion pass
#[derive(Debug, Default)]
pub struct SlugRegistry {
    issued: HashMap<String, usize>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `text`, suffixed with `-1`, `-2`, ... when already taken
    pub fn issue(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "heading".to_string();
        }

        let Some(count) = self.issued.get(&base).copied() else {
            self.issued.insert(base.clone(), 0);
            return base;
        };

        let mut n = count + 1;
        let mut candidate = format!("{base}-{n}");
        while self.issued.contains_key(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        debug!(slug = %candidate, "Heading slug collision");
        self.issued.insert(base, n);
        self.issued.insert(candidate.clone(), 0);
        candidate
    }
}
