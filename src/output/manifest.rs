//! `index.json` manifest
//!
//! The persisted form of a [`CrawlResult`]. Written once at the end of a crawl,
//! including interrupted ones, through a temporary file and a rename so readers never
//! see a half-written manifest.

use crate::output::types::{CrawlResult, CrawledPage, OutputError, OutputResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the manifest at the root of the output directory
pub const MANIFEST_FILE: &str = "index.json";

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    version: &'static str,
    crawl_started: DateTime<Utc>,
    crawl_finished: DateTime<Utc>,
    elapsed_seconds: f64,
    interrupted: bool,
    seed_urls: &'a [String],
    sitemap_url: Option<&'a str>,
    max_depth: u32,
    output_format: &'static str,
    config_hash: Option<&'a str>,
    successful_count: usize,
    failed_count: usize,
    skipped_count: usize,
    pages: &'a [CrawledPage],
}

impl<'a> From<&'a CrawlResult> for Manifest<'a> {
    fn from(result: &'a CrawlResult) -> Self {
        Self {
            version: MANIFEST_VERSION,
            crawl_started: result.started_at,
            crawl_finished: result.finished_at,
            elapsed_seconds: result.elapsed.as_secs_f64(),
            interrupted: result.interrupted,
            seed_urls: &result.seed_urls,
            sitemap_url: result.sitemap_url.as_deref(),
            max_depth: result.max_depth,
            output_format: result.output_format.as_str(),
            config_hash: result.config_hash.as_deref(),
            successful_count: result.successful_count(),
            failed_count: result.failed_count(),
            skipped_count: result.skipped_count,
            pages: &result.pages,
        }
    }
}

/// Serializes a crawl result to pretty-printed JSON
pub fn manifest_json(result: &CrawlResult) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(&Manifest::from(result))?)
}

/// Writes `index.json` at the root of `output_dir`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written manifest
/// * `Err(OutputError)` - Serialization or filesystem failure
pub fn write_manifest(result: &CrawlResult, output_dir: &Path) -> OutputResult<PathBuf> {
    let json = manifest_json(result)?;

    let final_path = output_dir.join(MANIFEST_FILE);
    let tmp_path = output_dir.join(format!("{}.tmp", MANIFEST_FILE));

    std::fs::write(&tmp_path, json.as_bytes()).map_err(|source| OutputError::Write {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, &final_path).map_err(|source| OutputError::Write {
        path: final_path.display().to_string(),
        source,
    })?;

    info!(
        "Manifest written to {} ({} pages)",
        final_path.display(),
        result.pages.len()
    );
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn sample_result() -> CrawlResult {
        let mut result = CrawlResult::new(
            vec!["https://example.com/".to_string()],
            2,
            OutputFormat::Markdown,
        );
        result.pages.push(
            CrawledPage::success("https://example.com/", 0, "example.com/index.md".into(), 42)
                .with_title(Some("Home".to_string()))
                .with_http_status(Some(200)),
        );
        result.pages.push(
            CrawledPage::failure("https://example.com/x", 1, "http_error", "HTTP 500")
                .with_http_status(Some(500)),
        );
        result.skipped_count = 3;
        result
    }

    #[test]
    fn test_manifest_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&manifest_json(&sample_result()).unwrap()).unwrap();

        assert_eq!(json["version"], "1.0");
        assert_eq!(json["successful_count"], 1);
        assert_eq!(json["failed_count"], 1);
        assert_eq!(json["skipped_count"], 3);
        assert_eq!(json["interrupted"], false);
        assert_eq!(json["output_format"], "markdown");
        assert!(json["sitemap_url"].is_null());
        assert!(json["crawl_started"].is_string());

        let pages = json["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["status"], "success");
        assert_eq!(pages[0]["output_path"], "example.com/index.md");
        assert_eq!(pages[0]["bytes"], 42);
        assert!(pages[0]["error"].is_null());
        assert_eq!(pages[1]["status"], "failed");
        assert!(pages[1]["output_path"].is_null());
        assert_eq!(pages[1]["error"], "HTTP 500");
        assert_eq!(pages[1]["depth"], 1);
    }

    #[test]
    fn test_write_manifest_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();

        let path = write_manifest(&result, dir.path()).unwrap();
        assert_eq!(path, dir.path().join(MANIFEST_FILE));
        assert!(!dir.path().join("index.json.tmp").exists());

        // Second write overwrites the first
        write_manifest(&result, dir.path()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["pages"].as_array().unwrap().len(), 2);
    }
}
