//! Line-break normalization for Japanese prose.
//!
//! PDF extraction breaks sentences at every visual line end. Japanese does not
//! separate words with spaces, so wrapped body lines are rejoined without
//! one. Lines stay separate when the previous one closes a sentence, when
//! either looks like a heading, and at blank lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::clean::finish;
use crate::corpus::is_marker;

/// Characters that usually close a sentence.
pub const SENTENCE_END: &str = "。！？）」』】］〉》";

/// Lines up to this many characters without `。` or `、` are treated as headings.
const SHORT_HEADING_CHARS: usize = 30;

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(第\s*[0-9０-９一二三四五六七八九十百]+\s*[章節項]|",
            r"[0-9０-９]+[．.\-−－][0-9０-９]+|",
            r"[0-9０-９]+[．.)]|",
            r"目次|参考文献|索引|付録)"
        ))
        .unwrap()
    })
}

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9０-９\s]+$").unwrap())
}

/// Whether a line should stand on its own instead of being joined.
///
/// Markers, numbered headings and short lines without Japanese punctuation
/// qualify. Short lines made only of digits are page numbers, not headings.
pub fn is_headlike(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    if is_marker(line) {
        return true;
    }

    if line.chars().count() <= SHORT_HEADING_CHARS && !line.contains('。') && !line.contains('、')
    {
        return !numeric_regex().is_match(line);
    }

    heading_regex().is_match(line)
}

fn ends_sentence(buffer: &str) -> bool {
    buffer
        .chars()
        .next_back()
        .is_some_and(|c| SENTENCE_END.contains(c))
}

/// Rejoin wrapped lines of body text.
///
/// The output keeps blank lines as paragraph boundaries, collapses three or
/// more newlines to two, and ends with a single newline.
pub fn normalize_breaks(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for raw in text.lines() {
        let line = raw.trim();

        if line.is_empty() {
            if !buffer.is_empty() {
                out.push(std::mem::take(&mut buffer));
            }
            out.push(String::new());
            continue;
        }

        if is_headlike(line) {
            if !buffer.is_empty() {
                out.push(std::mem::take(&mut buffer));
            }
            out.push(line.to_string());
            continue;
        }

        if !buffer.is_empty() && ends_sentence(&buffer) {
            out.push(std::mem::take(&mut buffer));
        }
        buffer.push_str(line);
    }

    if !buffer.is_empty() {
        out.push(buffer);
    }

    finish(&out.join("\n"))
}
