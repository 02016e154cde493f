//! Byte-bounded paragraph chunking.
//!
//! Morphological analyzers refuse inputs above a fixed UTF-8 size, so year
//! corpora are fed to them in chunks. [`chunk`] walks the text once and
//! yields chunks that keep paragraphs together whenever they fit, falling
//! back to whole lines and, as a last resort, to single characters.
//!
//! ```text
//! AccumulatingParagraphs --(paragraph > max)--> SplittingLines
//! SplittingLines         --(line > max)-------> SplittingCharacters
//! SplittingCharacters    --(line exhausted)---> SplittingLines
//! SplittingLines         --(para exhausted)---> AccumulatingParagraphs
//! ```
//!
//! Every transition flushes the pending buffer first, so a chunk never mixes
//! levels.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ceiling used by the tokenize stage, leaving headroom below
/// [`TOKENIZER_INPUT_LIMIT`].
pub const DEFAULT_MAX_BYTES: usize = 45_000;

/// Largest UTF-8 input the morphological analyzer accepts.
pub const TOKENIZER_INPUT_LIMIT: usize = 49_149;

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const LINE_SEPARATOR: &str = "\n";

/// Chunking limits.
///
/// `max_bytes` must be positive. Zero is not rejected: every character is
/// then emitted on its own, each one over the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub max_bytes: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AccumulatingParagraphs,
    SplittingLines,
    SplittingCharacters,
    Finished,
}

/// Lazy chunk sequence returned by [`chunk`].
///
/// Each item is at most `max_bytes` long, except a chunk made of a single
/// character whose own encoding is larger than `max_bytes`.
pub struct Chunks<'a> {
    paragraphs: regex::Split<'static, 'a>,
    lines: Option<std::str::Lines<'a>>,
    chars: Option<std::str::Chars<'a>>,
    max_bytes: usize,
    state: State,
    buffer: String,
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").unwrap())
}

/// Split `text` into byte-bounded chunks.
///
/// `text` is expected to use `\n` line breaks with blank-line delimited
/// paragraphs. The iterator borrows `text`; calling `chunk` again on the same
/// input yields the same sequence.
pub fn chunk<'a>(text: &'a str, config: &ChunkerConfig) -> Chunks<'a> {
    Chunks {
        paragraphs: paragraph_break().split(text),
        lines: None,
        chars: None,
        max_bytes: config.max_bytes,
        state: State::AccumulatingParagraphs,
        buffer: String::new(),
    }
}

impl Chunks<'_> {
    /// Take the buffer as a chunk, unless it holds nothing but whitespace.
    fn flush(&mut self) -> Option<String> {
        let out = std::mem::take(&mut self.buffer);
        if out.trim().is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Append a piece that fits on its own. Returns the previous buffer when
    /// the joined result would exceed the limit.
    fn push_piece(&mut self, piece: &str, separator: &str) -> Option<String> {
        if self.buffer.is_empty() {
            self.buffer.push_str(piece);
            return None;
        }

        let joined = self.buffer.len() + separator.len() + piece.len();
        if joined <= self.max_bytes {
            self.buffer.push_str(separator);
            self.buffer.push_str(piece);
            None
        } else {
            let out = self.flush();
            self.buffer.push_str(piece);
            out
        }
    }

    fn push_char(&mut self, ch: char) -> Option<String> {
        if !self.buffer.is_empty() && self.buffer.len() + ch.len_utf8() > self.max_bytes {
            let out = self.flush();
            self.buffer.push(ch);
            return out;
        }
        // An empty buffer always takes the character, even an oversized one.
        self.buffer.push(ch);
        None
    }

    fn next_paragraph(&mut self) -> Option<String> {
        let Some(paragraph) = self.paragraphs.next() else {
            self.state = State::Finished;
            return self.flush();
        };

        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            return None;
        }

        if paragraph.len() > self.max_bytes {
            self.lines = Some(paragraph.lines());
            self.state = State::SplittingLines;
            return self.flush();
        }

        self.push_piece(paragraph, PARAGRAPH_SEPARATOR)
    }

    fn next_line(&mut self) -> Option<String> {
        let Some(line) = self.lines.as_mut().and_then(Iterator::next) else {
            self.lines = None;
            self.state = State::AccumulatingParagraphs;
            return self.flush();
        };

        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.len() > self.max_bytes {
            self.chars = Some(line.chars());
            self.state = State::SplittingCharacters;
            return self.flush();
        }

        self.push_piece(line, LINE_SEPARATOR)
    }

    fn next_char(&mut self) -> Option<String> {
        match self.chars.as_mut().and_then(Iterator::next) {
            Some(ch) => self.push_char(ch),
            None => {
                self.chars = None;
                self.state = State::SplittingLines;
                self.flush()
            }
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let emitted = match self.state {
                State::AccumulatingParagraphs => self.next_paragraph(),
                State::SplittingLines => self.next_line(),
                State::SplittingCharacters => self.next_char(),
                State::Finished => return None,
            };
            if emitted.is_some() {
                return emitted;
            }
        }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
