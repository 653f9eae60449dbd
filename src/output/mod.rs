//! Output module for writing crawl results
//!
//! This module handles:
//! - Mapping URLs to files under the output directory
//! - Writing converted pages
//! - The `index.json` manifest
//! - The end-of-crawl summary

mod manifest;
mod paths;
mod summary;
mod types;

pub use manifest::{manifest_json, write_manifest, MANIFEST_FILE, MANIFEST_VERSION};
pub use paths::{url_to_filepath, OutputManager};
pub use summary::format_summary;
pub use types::{CrawlResult, CrawledPage, OutputError, OutputResult, PageStatus};
