//! Naming and layout conventions of the year-level corpus files.
//!
//! Every stage reads and writes plain UTF-8 text. Debug markers are kept in
//! the text so a line can always be traced back to its source PDF and page:
//!
//! ```text
//! ### SOURCE: 2017_whitepaper.pdf ###
//! ## PAGE 1 ##
//! ...
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Start of the line that names the PDF the following pages came from.
pub const SOURCE_MARKER_PREFIX: &str = "### SOURCE:";

/// Start of a page marker inside an extracted PDF.
pub const PAGE_MARKER_PREFIX: &str = "## PAGE";

/// Start of the page marker written in front of collected HTML pages.
pub const COLLECTED_PAGE_PREFIX: &str = "### PAGE";

/// Year label used when neither the path nor the file name carries one.
pub const UNKNOWN_YEAR: &str = "unknown";

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"20\d{2}").unwrap())
}

/// `true` for any of the debug marker lines.
pub fn is_marker(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with(SOURCE_MARKER_PREFIX)
        || line.starts_with(PAGE_MARKER_PREFIX)
        || line.starts_with(COLLECTED_PAGE_PREFIX)
}

pub fn source_marker(name: &str) -> String {
    format!("{SOURCE_MARKER_PREFIX} {name} ###")
}

/// `## PAGE n ##`, pages numbered from 1.
pub fn page_marker(page: usize) -> String {
    format!("{PAGE_MARKER_PREFIX} {page} ##")
}

/// Zero-padded three digit key used for collected pages (`007`).
pub fn page_key(page: u32) -> String {
    format!("{page:03}")
}

/// File name of a collected page on the remote archive.
pub fn page_file_name(prefix: &str, page: u32) -> String {
    format!("{prefix}{}.html", page_key(page))
}

/// Prefix collected page text with its `### PAGE NNN ###` header.
pub fn with_page_header(page: u32, text: &str) -> String {
    format!("{COLLECTED_PAGE_PREFIX} {} ###\n\n{text}", page_key(page))
}

/// Infer the publication year of a PDF.
///
/// The first path component that starts with `20XX` wins (`pdf/2017/a.pdf`,
/// `2019_part1/a.pdf`). Otherwise the file name is searched anywhere.
pub fn year_from_path(path: &Path) -> String {
    let re = year_regex();

    for component in path.components() {
        let part = component.as_os_str().to_string_lossy();
        if let Some(m) = re.find(&part) {
            if m.start() == 0 {
                return m.as_str().to_string();
            }
        }
    }

    path.file_name()
        .and_then(|name| re.find(&name.to_string_lossy()).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

/// Year of an intermediate corpus file (`2017.clean.txt`, `2017.norm.txt`).
///
/// Falls back to the part of the file name before the first dot.
pub fn year_from_filename(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(m) = year_regex().find(&name) {
        return m.as_str().to_string();
    }

    name.split('.').next().unwrap_or_default().to_string()
}

/// Join rendered pages into one document.
///
/// Each page is preceded by its marker and followed by an empty line. The
/// result is trimmed and ends with exactly one newline.
pub fn assemble_document<I, P>(pages: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<[String]>,
{
    let mut out: Vec<String> = Vec::new();
    for (index, lines) in pages.into_iter().enumerate() {
        out.push(page_marker(index + 1));
        out.extend(lines.as_ref().iter().cloned());
        out.push(String::new());
    }
    format!("{}\n", out.join("\n").trim())
}

/// Append one extracted PDF to a year corpus under its SOURCE marker.
pub fn append_source(corpus: &mut String, name: &str, document: &str) {
    corpus.push_str(&source_marker(name));
    corpus.push('\n');
    corpus.push_str(document);
    corpus.push('\n');
}

/// Size of a corpus file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Unicode scalar values, newlines included.
    pub chars: usize,
    /// Whitespace-separated runs.
    pub words: usize,
}

pub fn text_stats(text: &str) -> TextStats {
    TextStats {
        chars: text.chars().count(),
        words: text.split_whitespace().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(source_marker("a.pdf"), "### SOURCE: a.pdf ###");
        assert_eq!(page_marker(12), "## PAGE 12 ##");
        assert!(is_marker("## PAGE 12 ##"));
        assert!(is_marker("  ### SOURCE: a.pdf ###"));
        assert!(is_marker("### PAGE 003 ###"));
        assert!(!is_marker("第1章 総論"));
    }

    #[test]
    fn test_page_naming() {
        assert_eq!(page_key(7), "007");
        assert_eq!(page_key(268), "268");
        assert_eq!(
            page_file_name("hpaa195801_2_", 3),
            "hpaa195801_2_003.html"
        );
        assert_eq!(with_page_header(3, "本文"), "### PAGE 003 ###\n\n本文");
    }

    #[test]
    fn test_year_from_directory() {
        assert_eq!(year_from_path(Path::new("pdf/2017/whitepaper.pdf")), "2017");
        assert_eq!(year_from_path(Path::new("pdf/2019_part1/a.pdf")), "2019");
    }

    #[test]
    fn test_year_from_file_name() {
        assert_eq!(year_from_path(Path::new("pdf/misc/wp2021_all.pdf")), "2021");
        assert_eq!(year_from_path(Path::new("pdf/misc/report.pdf")), "unknown");
    }

    #[test]
    fn test_year_prefix_must_start_component() {
        // "x2018" in a directory does not count, the file name still does.
        assert_eq!(year_from_path(Path::new("x2018/2020a.pdf")), "2020");
    }

    #[test]
    fn test_year_from_corpus_file() {
        assert_eq!(year_from_filename(Path::new("txt_clean/2017.clean.txt")), "2017");
        assert_eq!(year_from_filename(Path::new("txt_clean/unknown.clean.txt")), "unknown");
        assert_eq!(year_from_filename(Path::new("txt/015.txt")), "015");
    }

    #[test]
    fn test_assemble_document() {
        let pages = vec![
            vec!["一".to_string(), "二".to_string()],
            vec![],
            vec!["三".to_string()],
        ];
        assert_eq!(
            assemble_document(&pages),
            "## PAGE 1 ##\n一\n二\n\n## PAGE 2 ##\n\n## PAGE 3 ##\n三\n"
        );
        assert_eq!(assemble_document(Vec::<Vec<String>>::new()), "\n");
    }

    #[test]
    fn test_append_source() {
        let mut corpus = String::new();
        append_source(&mut corpus, "a.pdf", "## PAGE 1 ##\n本文\n");
        assert_eq!(corpus, "### SOURCE: a.pdf ###\n## PAGE 1 ##\n本文\n\n");
    }

    #[test]
    fn test_text_stats() {
        let stats = text_stats("科学 技術\nの 振興\n");
        assert_eq!(stats.chars, 11);
        assert_eq!(stats.words, 4);
    }
}
