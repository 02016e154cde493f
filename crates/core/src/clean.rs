//! Light, conservative noise removal for extracted whitepaper text.
//!
//! PDF extraction leaves behind figure captions, table cells and page
//! furniture. Lines that look like those are dropped; everything that might
//! be running prose is kept.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::corpus::is_marker;

/// Prefixes that mark captions, sources and notes.
const CAPTION_PREFIXES: &[&str] = &["図", "表", "出典", "注", "資料", "（注）", "※", "出所"];

/// Characters counted toward the symbol ratio.
const SYMBOL_CHARS: &str = "•·●○▲△■□◆◇※-–—….,:;()[]{}％%／/|=+*";

/// Thresholds for [`is_tableish`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Lines with fewer characters than this are always dropped.
    pub min_line_chars: usize,
    /// Ratio checks only apply to lines shorter than this.
    pub ratio_max_line_chars: usize,
    pub max_digit_ratio: f32,
    pub max_symbol_ratio: f32,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            min_line_chars: 3,
            ratio_max_line_chars: 80,
            max_digit_ratio: 0.35,
            max_symbol_ratio: 0.30,
        }
    }
}

/// Heuristic check for caption, table cell or otherwise non-sentential lines.
pub fn is_tableish(line: &str, config: &CleanConfig) -> bool {
    let len = line.chars().count();
    if len < config.min_line_chars {
        return true;
    }
    if CAPTION_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }
    if len >= config.ratio_max_line_chars {
        return false;
    }

    let digits = line.chars().filter(|c| c.is_numeric()).count();
    let symbols = line.chars().filter(|c| SYMBOL_CHARS.contains(*c)).count();
    let len = len as f32;

    digits as f32 / len > config.max_digit_ratio || symbols as f32 / len > config.max_symbol_ratio
}

/// Drop table-ish lines, collapse spaces and excess blank lines.
///
/// Marker lines (`### SOURCE:`, `## PAGE`, `### PAGE`) are kept verbatim. Blank lines are
/// kept so paragraphs survive; runs of three or more newlines become two.
pub fn clean_text(text: &str, config: &CleanConfig) -> String {
    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"[ \t]{2,}").unwrap());

    let mut cleaned: Vec<String> = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();

        if is_marker(line) {
            cleaned.push(line.to_string());
            continue;
        }
        if line.is_empty() {
            cleaned.push(String::new());
            continue;
        }
        if is_tableish(line, config) {
            continue;
        }

        cleaned.push(re_spaces.replace_all(line, " ").into_owned());
    }

    finish(&cleaned.join("\n"))
}

/// Collapse 3+ newlines, trim, end with a single newline.
pub(crate) fn finish(text: &str) -> String {
    static RE_BLANKS: OnceLock<Regex> = OnceLock::new();
    let re_blanks = RE_BLANKS.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    let collapsed = re_blanks.replace_all(text, "\n\n");
    format!("{}\n", collapsed.trim())
}
