//! The `manifest.csv` ledger written by the collector.
//!
//! One row is appended per fetch attempt. A rerun skips every page that
//! already has an `OK` row, so interrupted collections resume where they
//! stopped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Column order of the manifest header.
pub const MANIFEST_FIELDS: [&str; 7] = [
    "page",
    "url",
    "status",
    "http_status",
    "bytes",
    "sha256",
    "note",
];

/// Longest `note` kept for transport errors.
const MAX_NOTE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NG")]
    Ng,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub page: String,
    pub url: String,
    pub status: FetchStatus,
    /// Empty when the request never produced a response.
    pub http_status: Option<u16>,
    pub bytes: usize,
    pub sha256: String,
    pub note: String,
}

impl ManifestRow {
    /// A page saved successfully.
    pub fn ok(page: &str, url: &str, http_status: u16, body: &[u8]) -> Self {
        Self {
            page: page.to_string(),
            url: url.to_string(),
            status: FetchStatus::Ok,
            http_status: Some(http_status),
            bytes: body.len(),
            sha256: sha256_hex(body),
            note: String::new(),
        }
    }

    /// The server answered with something other than 200.
    pub fn http_failure(page: &str, url: &str, http_status: u16) -> Self {
        Self {
            page: page.to_string(),
            url: url.to_string(),
            status: FetchStatus::Ng,
            http_status: Some(http_status),
            bytes: 0,
            sha256: String::new(),
            note: "non-200".to_string(),
        }
    }

    /// The request failed before a response arrived.
    pub fn transport_failure(page: &str, url: &str, error: &str) -> Self {
        Self {
            page: page.to_string(),
            url: url.to_string(),
            status: FetchStatus::Ng,
            http_status: None,
            bytes: 0,
            sha256: String::new(),
            note: error.chars().take(MAX_NOTE_CHARS).collect(),
        }
    }

    /// The page arrived but could not be written to disk.
    pub fn save_failure(page: &str, url: &str, http_status: u16, error: &str) -> Self {
        Self {
            page: page.to_string(),
            url: url.to_string(),
            status: FetchStatus::Ng,
            http_status: Some(http_status),
            bytes: 0,
            sha256: String::new(),
            note: format!("save failed: {error}").chars().take(MAX_NOTE_CHARS).collect(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }
}

/// Lowercase hex SHA-256 of a response body.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Parse manifest CSV text, header included.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestRow>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<ManifestRow>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|source| CoreError::Manifest {
                // Header is line 1.
                line: index + 2,
                message: source.to_string(),
            })
        })
        .collect()
}

/// Page keys that already have an `OK` row.
pub fn completed_pages(rows: &[ManifestRow]) -> HashSet<String> {
    rows.iter()
        .filter(|row| row.is_ok())
        .map(|row| row.page.clone())
        .collect()
}
