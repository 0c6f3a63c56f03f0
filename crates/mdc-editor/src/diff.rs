//! Word diff
//!
//! Aligns two texts token by token (words and whitespace runs) with a
//! longest common subsequence table and reports the updated text as runs of
//! unchanged and added tokens. Tokens only present in the original are used
//! for alignment and then dropped, so the spans always concatenate back to
//! the updated text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Token ceiling per side; larger inputs are not diffed
pub const MAX_DIFF_TOKENS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Unchanged,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpan {
    #[serde(rename = "type")]
    pub kind: SpanKind,
    pub text: String,
}

/// Options for the word diff
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Maximum token count of either side
    pub max_tokens: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_tokens: MAX_DIFF_TOKENS,
        }
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+|\S+").expect("valid token regex"))
}

fn tokenize(text: &str) -> Vec<&str> {
    token_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Diff two texts word by word
pub fn word_diff(original: &str, updated: &str) -> Vec<DiffSpan> {
    word_diff_with_options(original, updated, &DiffOptions::default())
}

/// Diff two texts word by word with options
pub fn word_diff_with_options(
    original: &str,
    updated: &str,
    options: &DiffOptions,
) -> Vec<DiffSpan> {
    let a = tokenize(original);
    let b = tokenize(updated);
    if a.len() > options.max_tokens || b.len() > options.max_tokens {
        debug!(
            original = a.len(),
            updated = b.len(),
            max = options.max_tokens,
            "Skipping word diff over the token ceiling"
        );
        return Vec::new();
    }

    // lcs[i * width + j]: common subsequence length of a[i..] and b[j..]
    let width = b.len() + 1;
    let mut lcs = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut spans: Vec<DiffSpan> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while j < b.len() {
        if i < a.len() && a[i] == b[j] {
            push_span(&mut spans, SpanKind::Unchanged, b[j]);
            i += 1;
            j += 1;
        } else if i < a.len() && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            i += 1;
        } else {
            push_span(&mut spans, SpanKind::Added, b[j]);
            j += 1;
        }
    }
    spans
}

fn push_span(spans: &mut Vec<DiffSpan>, kind: SpanKind, token: &str) {
    match spans.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(token),
        _ => spans.push(DiffSpan {
            kind,
            text: token.to_string(),
        }),
    }
}
