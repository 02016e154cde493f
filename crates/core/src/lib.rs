//! Core library for hakusho
//!
//! This crate implements the **Functional Core** of the hakusho corpus
//! builder, following the Functional Core - Imperative Shell architectural
//! pattern.
//!
//! # Architecture Overview
//!
//! - **`hakusho_core`** (this crate): pure text transformations with zero I/O
//! - **`pdf`**: turns PDF bytes into positioned text fragments
//! - **`hakusho`**: the CLI that reads and writes the corpus directories
//!
//! Every function here takes its input as values and returns values, so the
//! pipeline stages can be tested with fixture strings alone.
//!
//! # Module Organization
//!
//! - [`reader`]: column-aware reading order for one page of fragments
//! - [`chunk`]: byte-bounded paragraph chunking ahead of tokenization
//! - [`clean`]: removal of captions and table debris
//! - [`normalize`]: rejoining of wrapped Japanese lines
//! - [`html`]: HTML to text, link discovery and charset decoding
//! - [`manifest`]: the collector's `manifest.csv` ledger
//! - [`tokens`]: the tokenizer seam and token filtering
//! - [`corpus`]: markers, file naming and year inference
//!
//! # Example Usage
//!
//! ```rust
//! use hakusho_core::chunk::{chunk, ChunkerConfig};
//! use hakusho_core::reader::{render_page, Page, ReaderConfig, TextFragment};
//!
//! let page = Page {
//!     width: 200.0,
//!     fragments: vec![
//!         TextFragment::new(10.0, 20.0, 90.0, 30.0, "二行目"),
//!         TextFragment::new(10.0, 0.0, 90.0, 10.0, "一行目"),
//!     ],
//! };
//! let lines = render_page(&page, &ReaderConfig::default());
//! assert_eq!(lines, vec!["一行目", "二行目"]);
//!
//! let chunks: Vec<String> = chunk("¶1\n\n¶2", &ChunkerConfig::default()).collect();
//! assert_eq!(chunks, vec!["¶1\n\n¶2"]);
//! ```

pub mod chunk;
pub mod clean;
pub mod corpus;
pub mod error;
pub mod html;
pub mod manifest;
pub mod normalize;
pub mod reader;
pub mod tokens;

pub use error::CoreError;
