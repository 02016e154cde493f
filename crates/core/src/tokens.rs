//! Tokenizer seam and token filtering.
//!
//! The corpus is tokenized chunk by chunk (see [`crate::chunk`]) because
//! morphological analyzers reject large inputs. Any analyzer can be plugged in
//! through [`Tokenizer`]; [`ScriptTokenizer`] is the dependency-free default
//! that segments at changes of script.
//!
//! Filtering only looks at surface forms, so it behaves the same whichever
//! tokenizer produced them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::TOKENIZER_INPUT_LIMIT;

/// Function words removed when stopword filtering is enabled.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "も", "な", "へ", "か",
    "や", "だ", "ず", "から", "まで", "より", "など", "ため", "こと", "もの", "よう", "これ",
    "それ", "この", "その", "ある", "あり", "いる", "おり", "する", "なる", "できる", "れる",
    "られる", "です", "ます", "および", "ならびに", "または", "について", "において", "における",
    "に関する", "による", "により", "として", "とともに", "ただし", "また", "さらに", "なお",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("input of {len} bytes exceeds the analyzer limit of {limit} bytes")]
    InputTooLarge { len: usize, limit: usize },

    #[error("analyzer failed: {0}")]
    Analyzer(String),
}

pub trait Tokenizer {
    /// Split `text` into token surfaces. Inputs longer than
    /// [`Tokenizer::max_input_bytes`] are rejected.
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError>;

    fn max_input_bytes(&self) -> usize {
        TOKENIZER_INPUT_LIMIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Space,
    Hiragana,
    Katakana,
    Kanji,
    Digit,
    Latin,
    Symbol,
}

impl Script {
    fn of(c: char) -> Self {
        match c {
            c if c.is_whitespace() => Script::Space,
            '\u{3041}'..='\u{309F}' => Script::Hiragana,
            '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
                Script::Katakana
            }
            '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '々'
            | '〆' => Script::Kanji,
            c if c.is_numeric() => Script::Digit,
            c if c.is_alphabetic() => Script::Latin,
            _ => Script::Symbol,
        }
    }
}

/// Segments text wherever the script changes.
///
/// Runs of kanji, katakana, hiragana, latin letters and digits each form one
/// token; every symbol is a token of its own. Whitespace separates tokens and
/// is never emitted. No part of speech is inferred, and inflected words split
/// at the kanji/kana boundary (`示す` gives `示`, `す`). Inputs above `limit`
/// bytes are rejected the way a real analyzer would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptTokenizer {
    pub limit: usize,
}

impl Default for ScriptTokenizer {
    fn default() -> Self {
        Self {
            limit: TOKENIZER_INPUT_LIMIT,
        }
    }
}

impl Tokenizer for ScriptTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        if text.len() > self.limit {
            return Err(TokenizeError::InputTooLarge {
                len: text.len(),
                limit: self.limit,
            });
        }

        let mut tokens = Vec::new();
        let mut run = String::new();
        let mut run_script = Script::Space;

        for c in text.chars() {
            let script = Script::of(c);
            let extends = script == run_script && script != Script::Symbol;
            if !extends && !run.is_empty() {
                tokens.push(std::mem::take(&mut run));
            }
            if script != Script::Space {
                run.push(c);
            }
            run_script = script;
        }
        if !run.is_empty() {
            tokens.push(run);
        }

        Ok(tokens)
    }

    fn max_input_bytes(&self) -> usize {
        self.limit
    }
}

/// Parse a stopword list: one word per line, blank lines and `#` comments
/// ignored.
pub fn parse_stopwords(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Which tokens make it into the token files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFilter {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_len: usize,
    /// Drop listed stopwords and tokens without a letter or digit.
    pub use_stopwords: bool,
    pub stopwords: BTreeSet<String>,
}

impl Default for TokenFilter {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            use_stopwords: false,
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl TokenFilter {
    pub fn keep(&self, token: &str) -> bool {
        let surface = token.trim();
        if surface.is_empty() || surface.chars().count() < self.min_token_len {
            return false;
        }
        if self.use_stopwords {
            return !self.stopwords.contains(surface) && surface.chars().any(char::is_alphanumeric);
        }
        true
    }
}

/// Tokenize one chunk and keep the surfaces that pass `filter`.
pub fn tokenize_chunk<T: Tokenizer + ?Sized>(
    text: &str,
    tokenizer: &T,
    filter: &TokenFilter,
) -> Result<Vec<String>, TokenizeError> {
    Ok(tokenizer
        .tokenize(text)?
        .into_iter()
        .filter(|t| filter.keep(t))
        .collect())
}
