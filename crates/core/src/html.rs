//! HTML page to plain text, plus the helpers the collector needs to find and
//! decode pages.

use std::sync::OnceLock;

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use regex::Regex;
use scraper::{Html, Node, Selector};

use crate::clean::finish;

/// Elements whose text never belongs to the page body.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// How many leading bytes are searched for a `<meta charset>` declaration.
const META_SNIFF_BYTES: usize = 2048;

/// Extract the visible text of an HTML document.
///
/// Every text node is trimmed and kept on its own line; empty nodes are
/// dropped. Text inside `script`, `style` and `noscript` is ignored.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let pieces: Vec<&str> = document
        .tree
        .nodes()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let skipped = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                });
                if skipped {
                    None
                } else {
                    Some(text.trim())
                }
            }
            _ => None,
        })
        .filter(|piece| !piece.is_empty())
        .collect();

    finish(&pieces.join("\n"))
}

/// `href` values of every `<a>` that contains `pattern` and points at an
/// `.html` file, in document order without duplicates.
///
/// Links are returned as written; resolving them against the index URL is the
/// caller's job.
pub fn extract_links(html: &str, pattern: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.contains(pattern) && href.ends_with(".html") && !links.iter().any(|l| l == href) {
            links.push(href.to_string());
        }
    }
    links
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_\-:.]+)"#).unwrap()
    });

    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head);
    re.captures(&head)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Encoding::for_label(m.as_str().as_bytes()))
}

/// Decode a fetched HTML body into a `String`.
///
/// The charset declared in the `Content-Type` header wins, then a `<meta>`
/// declaration in the document head. Without either, strict UTF-8 is tried
/// and Shift_JIS is assumed on failure, which is what older Japanese
/// government pages are written in.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(bytes));

    if let Some(encoding) = declared {
        let (decoded, _, _) = encoding.decode(bytes);
        return decoded.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
    }

    let (decoded, _, had_errors) = SHIFT_JIS.decode(bytes);
    if had_errors {
        let (lossy, _, _) = UTF_8.decode(bytes);
        return lossy.into_owned();
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_skips_scripts_and_styles() {
        let html = r#"<html><head><title>白書</title><style>p { color: red; }</style>
            <script>var x = 1;</script></head>
            <body><h1> 第1章 </h1><p>本文です。</p><noscript>JSを有効に</noscript>
            <div>  <span>表1</span>  </div></body></html>"#;
        assert_eq!(html_to_text(html), "白書\n第1章\n本文です。\n表1\n");
    }

    #[test]
    fn test_html_to_text_empty_document() {
        assert_eq!(html_to_text(""), "\n");
    }

    #[test]
    fn test_extract_links_filters_and_dedups() {
        let html = r#"<ul>
            <li><a href="hpaa195801_2_003.html">3</a></li>
            <li><a href="hpaa195801_2_004.html">4</a></li>
            <li><a href="hpaa195801_2_003.html">3 again</a></li>
            <li><a href="hpaa195801_2_005.pdf">pdf</a></li>
            <li><a href="index.html">top</a></li>
            <li><a>no href</a></li>
        </ul>"#;
        assert_eq!(
            extract_links(html, "hpaa195801_2_"),
            vec!["hpaa195801_2_003.html", "hpaa195801_2_004.html"]
        );
    }

    #[test]
    fn test_decode_declared_charset() {
        let (bytes, _, _) = SHIFT_JIS.encode("科学技術白書");
        assert_eq!(
            decode_html(&bytes, Some("text/html; charset=Shift_JIS")),
            "科学技術白書"
        );
    }

    #[test]
    fn test_decode_meta_charset() {
        let (bytes, _, _) = SHIFT_JIS.encode("<meta charset=\"shift_jis\"><p>白書</p>");
        assert_eq!(
            decode_html(&bytes, Some("text/html")),
            "<meta charset=\"shift_jis\"><p>白書</p>"
        );
    }

    #[test]
    fn test_decode_utf8_then_shift_jis_fallback() {
        assert_eq!(decode_html("白書".as_bytes(), None), "白書");
        let (bytes, _, _) = SHIFT_JIS.encode("昭和三十三年");
        assert_eq!(decode_html(&bytes, None), "昭和三十三年");
    }
}
