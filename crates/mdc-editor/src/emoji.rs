//! Emoji shortcode resolution

use regex::Regex;
use std::sync::OnceLock;

fn shortcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([a-z0-9_+\-]+):").expect("valid shortcode regex"))
}

/// A piece of text split around emoji shortcodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPiece<'a> {
    Plain(&'a str),
    Emoji { name: &'a str, glyph: &'static str },
}

/// Glyph for a GitHub-style shortcode such as `rocket` or `+1`
pub fn resolve(name: &str) -> Option<&'static str> {
    emojis::get_by_shortcode(name).map(|emoji| emoji.as_str())
}

/// Split text into plain runs and resolved emoji.
///
/// Shortcodes that do not resolve stay in the plain text.
pub fn split_shortcodes(text: &str) -> Vec<TextPiece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    let mut search_from = 0;

    while let Some(caps) = shortcode_re().captures_at(text, search_from) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        match resolve(name.as_str()) {
            Some(glyph) => {
                if whole.start() > last {
                    pieces.push(TextPiece::Plain(&text[last..whole.start()]));
                }
                pieces.push(TextPiece::Emoji {
                    name: name.as_str(),
                    glyph,
                });
                last = whole.end();
                search_from = whole.end();
            }
            // The closing colon may open the next shortcode
            None => search_from = whole.end() - 1,
        }
    }

    if last < text.len() {
        pieces.push(TextPiece::Plain(&text[last..]));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("rocket"), Some("🚀"));
        assert_eq!(resolve("+1"), Some("👍"));
        assert_eq!(resolve("not-an-emoji"), None);
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split_shortcodes("Ship it :rocket: now"),
            vec![
                TextPiece::Plain("Ship it "),
                TextPiece::Emoji {
                    name: "rocket",
                    glyph: "🚀"
                },
                TextPiece::Plain(" now"),
            ]
        );
    }

    #[test]
    fn test_unresolved_shortcodes_stay_plain() {
        assert_eq!(
            split_shortcodes("at 10:30:00 :nope:"),
            vec![TextPiece::Plain("at 10:30:00 :nope:")]
        );
    }

    #[test]
    fn test_closing_colon_can_open_next() {
        assert_eq!(
            split_shortcodes("10:20:smile:"),
            vec![
                TextPiece::Plain("10:20"),
                TextPiece::Emoji {
                    name: "smile",
                    glyph: "😄"
                },
            ]
        );
    }
}
