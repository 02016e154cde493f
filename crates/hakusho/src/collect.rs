use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use hakusho_core::corpus::{page_file_name, page_key, with_page_header};
use hakusho_core::html::{decode_html, extract_links, html_to_text};
use hakusho_core::manifest::{completed_pages, parse_manifest, ManifestRow};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::Url;

use crate::files::write_file;
use crate::prelude::{eprintln, println, *};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "ja,en;q=0.8";

const MANIFEST_FILE: &str = "manifest.csv";

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct CollectOptions {
    /// Directory receiving html/, txt/ and manifest.csv
    #[arg(long, env = "HAKUSHO_OUT_DIR", default_value = "data")]
    pub out_dir: PathBuf,

    /// Archived directory URL; pages are {base-url}{prefix}{NNN}.html
    #[arg(long, env = "HAKUSHO_BASE_URL", required_unless_present = "index_url", conflicts_with = "index_url")]
    pub base_url: Option<String>,

    /// File name prefix of numbered pages (e.g. hpaa195801_2_)
    #[arg(long, env = "HAKUSHO_PREFIX", default_value = "")]
    pub prefix: String,

    /// First page number
    #[arg(long, env = "HAKUSHO_START", default_value_t = 3)]
    pub start: u32,

    /// Last page number (inclusive)
    #[arg(long, env = "HAKUSHO_END", default_value_t = 268)]
    pub end: u32,

    /// Index page whose links are collected instead of a numbered range
    #[arg(long, env = "HAKUSHO_INDEX_URL", requires = "link_pattern")]
    pub index_url: Option<String>,

    /// Only links whose href contains this text are followed
    #[arg(long, env = "HAKUSHO_LINK_PATTERN")]
    pub link_pattern: Option<String>,

    /// Extra attempts after a failed request
    #[arg(long, env = "HAKUSHO_RETRIES", default_value_t = 2)]
    pub retries: u32,

    /// Pause before each retry, in milliseconds
    #[arg(long, env = "HAKUSHO_BACKOFF_MS", default_value_t = 1500)]
    pub backoff_ms: u64,

    /// Pause between pages, in milliseconds
    #[arg(long, env = "HAKUSHO_DELAY_MS", default_value_t = 800)]
    pub delay_ms: u64,

    /// Request timeout in seconds
    #[arg(short, long, env = "HAKUSHO_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
}

/// A page to fetch: its number and absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub page: u32,
    pub url: String,
}

/// Result of fetching one page, after retries.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Rejected(u16),
    Failed(String),
}

pub async fn run(options: CollectOptions, global: crate::Global) -> Result<()> {
    let referer = options
        .index_url
        .as_deref()
        .or(options.base_url.as_deref())
        .ok_or_eyre("Either --base-url or --index-url is required")?;
    let client = build_client(referer, options.timeout)?;

    let targets = match (&options.index_url, &options.base_url) {
        (Some(index_url), _) => {
            let pattern = options
                .link_pattern
                .as_deref()
                .ok_or_eyre("--index-url requires --link-pattern")?;
            index_targets(&client, index_url, pattern).await?
        }
        (None, Some(base_url)) => range_targets(base_url, &options.prefix, options.start, options.end)?,
        (None, None) => return Err(eyre!("Either --base-url or --index-url is required")),
    };

    if global.verbose {
        println!("Output: {}", options.out_dir.display());
        println!("Pages: {}", targets.len());
        println!();
    }

    let manifest_path = options.out_dir.join(MANIFEST_FILE);
    let done = load_completed(&manifest_path)?;
    let mut manifest = ManifestWriter::open(&manifest_path)?;

    let (mut ok, mut ng) = (0, 0);
    for target in targets {
        let key = page_key(target.page);
        if done.contains(&key) {
            println!("{} {key} (already OK)", "[SKIP]".dimmed());
            continue;
        }

        log::debug!("fetching {key} {}", target.url);
        let outcome = fetch_with_retries(&client, &target.url, options.retries, options.backoff_ms).await;
        let row = record_outcome(&options.out_dir, &target, outcome);
        if row.is_ok() {
            ok += 1;
        } else {
            ng += 1;
        }
        manifest.append(&row)?;

        tokio::time::sleep(Duration::from_millis(options.delay_ms)).await;
    }

    println!("Done. OK={}, NG={}", ok.to_string().green(), ng.to_string().red());
    Ok(())
}

fn build_client(referer: &str, timeout: u64) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));
    headers.insert(
        REFERER,
        HeaderValue::from_str(referer).wrap_err("Invalid referer URL")?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout))
        .build()
        .map_err(|e| Error::Network(e.to_string()).into())
}

/// Numbered pages `start..=end` below `base_url`.
pub fn range_targets(base_url: &str, prefix: &str, start: u32, end: u32) -> Result<Vec<Target>> {
    let base = Url::parse(base_url).wrap_err_with(|| f!("Invalid base URL: {base_url}"))?;
    (start..=end)
        .map(|page| {
            let url = base
                .join(&page_file_name(prefix, page))
                .wrap_err("Failed to build page URL")?;
            Ok(Target {
                page,
                url: url.to_string(),
            })
        })
        .collect()
}

/// Resolve matching hrefs against the index URL. Pages are numbered in
/// link order starting at 0.
pub fn resolve_links(index_url: &str, hrefs: &[String]) -> Result<Vec<Target>> {
    let base = Url::parse(index_url).wrap_err_with(|| f!("Invalid index URL: {index_url}"))?;
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for href in hrefs {
        let url = base
            .join(href)
            .wrap_err_with(|| f!("Invalid link: {href}"))?
            .to_string();
        if seen.insert(url.clone()) {
            targets.push(Target {
                page: targets.len() as u32,
                url,
            });
        }
    }
    Ok(targets)
}

async fn index_targets(client: &reqwest::Client, index_url: &str, pattern: &str) -> Result<Vec<Target>> {
    let (status, content_type, body) = fetch_once(client, index_url)
        .await
        .map_err(|e| Error::Network(f!("Failed to fetch index {index_url}: {e}")))?;
    if status != 200 {
        return Err(Error::Network(f!("Failed to fetch index {index_url}: HTTP {status}")).into());
    }

    let html = decode_html(&body, content_type.as_deref());
    let targets = resolve_links(index_url, &extract_links(&html, pattern))?;
    println!("found: {}", targets.len());
    Ok(targets)
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<(u16, Option<String>, Vec<u8>), reqwest::Error> {
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();
    Ok((status, content_type, body))
}

async fn fetch_with_retries(client: &reqwest::Client, url: &str, retries: u32, backoff_ms: u64) -> FetchOutcome {
    let mut attempt = 0;
    loop {
        let outcome = match fetch_once(client, url).await {
            Ok((200, content_type, body)) => {
                return FetchOutcome::Fetched {
                    status: 200,
                    content_type,
                    body,
                }
            }
            Ok((status, _, _)) => FetchOutcome::Rejected(status),
            Err(err) => FetchOutcome::Failed(err.to_string()),
        };

        if attempt >= retries {
            return outcome;
        }
        attempt += 1;
        log::warn!("retrying {url} ({attempt}/{retries}) after {outcome:?}");
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }
}

/// Save a fetched page and describe the result as a manifest row. A page
/// that cannot be written is recorded as NG and the run goes on.
pub fn record_outcome(out_dir: &Path, target: &Target, outcome: FetchOutcome) -> ManifestRow {
    let key = page_key(target.page);
    match outcome {
        FetchOutcome::Fetched {
            status,
            content_type,
            body,
        } => match save_page(out_dir, target.page, &body, content_type.as_deref()) {
            Ok(()) => {
                println!("{} {key}", "[OK]".green());
                ManifestRow::ok(&key, &target.url, status, &body)
            }
            Err(err) => {
                log::warn!("failed to save page {key}: {err:#}");
                eprintln!("{} {key} {err}", "[ERR]".red().bold());
                ManifestRow::save_failure(&key, &target.url, status, &f!("{err:#}"))
            }
        },
        FetchOutcome::Rejected(status) => {
            eprintln!("{} {key} HTTP {status}", "[NG]".red());
            ManifestRow::http_failure(&key, &target.url, status)
        }
        FetchOutcome::Failed(error) => {
            eprintln!("{} {key} {error}", "[ERR]".red().bold());
            ManifestRow::transport_failure(&key, &target.url, &error)
        }
    }
}

/// Write `html/NNN.html` and `txt/NNN.txt` for one fetched page.
pub fn save_page(out_dir: &Path, page: u32, body: &[u8], content_type: Option<&str>) -> Result<()> {
    let key = page_key(page);
    write_file(&out_dir.join("html").join(f!("{key}.html")), body)?;

    let text = html_to_text(&decode_html(body, content_type));
    write_file(&out_dir.join("txt").join(f!("{key}.txt")), with_page_header(page, &text))?;
    Ok(())
}

/// Pages already recorded as `OK` in an existing manifest.
pub fn load_completed(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let text = std::fs::read_to_string(path).wrap_err_with(|| f!("Failed to read {}", path.display()))?;
    let rows = parse_manifest(&text).wrap_err_with(|| f!("Invalid manifest {}", path.display()))?;
    Ok(completed_pages(&rows))
}

/// Appends rows to `manifest.csv`, writing the header only for a new file.
pub struct ManifestWriter {
    writer: csv::Writer<std::fs::File>,
}

impl ManifestWriter {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let need_header = !path.exists() || std::fs::metadata(path)?.len() == 0;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| f!("Failed to open {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(need_header)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Append one row and flush so an interrupted run keeps it.
    pub fn append(&mut self, row: &ManifestRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}
