use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Kangxi radicals block. Japanese PDFs often emit these in place of the
/// unified ideographs they look like.
const KANGXI_RADICALS: std::ops::RangeInclusive<char> = '\u{2F00}'..='\u{2FD5}';

/// Repair the glyph-level damage PDF text extraction leaves behind.
///
/// Applies NFC normalization, maps Kangxi radicals to their unified
/// ideographs, expands Latin ligatures, drops replacement and control
/// characters, and trims trailing spaces on every line. Line structure is
/// kept intact; paragraph joining happens later in the pipeline.
pub fn cleanup_text(text: &str) -> String {
    // 1. Unicode NFC normalization, with compatibility mapping limited to
    //    Kangxi radicals so full-width forms survive.
    let mut result: String = text
        .nfc()
        .flat_map(|c| {
            if KANGXI_RADICALS.contains(&c) {
                c.to_string().nfkc().collect::<Vec<_>>()
            } else {
                vec![c]
            }
        })
        .collect();

    // 2. Fix ligatures (fi, fl, ffi, ffl).
    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    // 3. Remove replacement and control characters.
    result.retain(|c| c != '\u{FFFD}' && (c == '\n' || c == '\t' || !c.is_control()));

    // 4. Trailing whitespace per line.
    static RE_TRAILING: OnceLock<Regex> = OnceLock::new();
    let re_trailing = RE_TRAILING.get_or_init(|| Regex::new(r"(?m)[ \t\u{3000}]+$").unwrap());
    re_trailing.replace_all(&result, "").into_owned()
}
