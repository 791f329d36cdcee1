//! Text cleanup for extracted slide elements.
//!
//! Slide XML splits text into runs and often carries stray tabs, repeated
//! spaces and empty paragraphs. The model only needs readable lines.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple spaces and tabs into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

/// Characters PowerPoint uses for soft line breaks and bullets.
const CONTROL_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{000B}', "\n"), // vertical tab: shift-enter line break
    ('\u{2028}', "\n"), // line separator
    ('\u{2029}', "\n"), // paragraph separator
    ('\u{FEFF}', ""),   // byte order mark
];

/// Cleans element text before it is handed to the context builder.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner;

impl TextCleaner {
    /// Create a cleaner.
    pub fn new() -> Self {
        Self
    }

    /// Clean a single fragment.
    ///
    /// Applies NFC normalization, collapses horizontal whitespace, trims each
    /// line and drops empty ones.
    pub fn clean(&self, text: &str) -> String {
        let mut normalized: String = text.nfc().collect();
        for (from, to) in CONTROL_REPLACEMENTS {
            if normalized.contains(*from) {
                normalized = normalized.replace(*from, to);
            }
        }

        normalized
            .lines()
            .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
