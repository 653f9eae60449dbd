//! Crawl result types
//!
//! This module defines the records produced by a crawl and the error type for
//! output operations.

use crate::config::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path {0} escapes the output directory")]
    PathEscape(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Outcome of one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Failed,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Result record for one fetch attempt, serialized as a manifest page entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawledPage {
    pub url: String,
    pub status: PageStatus,
    pub depth: u32,
    /// Path relative to the output directory, present only on success
    pub output_path: Option<String>,
    /// Failure description, present only on failure
    pub error: Option<String>,
    /// Machine-readable failure kind (`not_found`, `http_error`, ...)
    pub error_kind: Option<String>,
    /// Size of the fetched content in bytes
    pub bytes: Option<u64>,
    pub title: Option<String>,
    pub http_status: Option<u16>,
    pub discovered_from: Option<String>,
    pub crawled_at: DateTime<Utc>,
}

impl CrawledPage {
    /// Record of a page that was fetched, converted and written
    pub fn success(url: impl Into<String>, depth: u32, output_path: String, bytes: u64) -> Self {
        Self {
            url: url.into(),
            status: PageStatus::Success,
            depth,
            output_path: Some(output_path),
            error: None,
            error_kind: None,
            bytes: Some(bytes),
            title: None,
            http_status: None,
            discovered_from: None,
            crawled_at: Utc::now(),
        }
    }

    /// Record of a page whose fetch, conversion or write failed
    pub fn failure(
        url: impl Into<String>,
        depth: u32,
        kind: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status: PageStatus::Failed,
            depth,
            output_path: None,
            error: Some(error.into()),
            error_kind: Some(kind.into()),
            bytes: None,
            title: None,
            http_status: None,
            discovered_from: None,
            crawled_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    pub fn with_bytes(mut self, bytes: Option<u64>) -> Self {
        self.bytes = bytes;
        self
    }

    pub fn discovered_from(mut self, from: Option<&url::Url>) -> Self {
        self.discovered_from = from.map(|u| u.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// Aggregate of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Fetch attempts in the order they were made
    pub pages: Vec<CrawledPage>,
    /// URLs rejected by scope or depth; never fetched
    pub skipped_count: usize,
    /// The crawl was cancelled before the frontier drained
    pub interrupted: bool,
    pub elapsed: Duration,
    pub seed_urls: Vec<String>,
    pub sitemap_url: Option<String>,
    pub max_depth: u32,
    pub output_format: OutputFormat,
    pub config_hash: Option<String>,
}

impl CrawlResult {
    /// Empty result for a crawl starting now
    pub fn new(seed_urls: Vec<String>, max_depth: u32, output_format: OutputFormat) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            pages: Vec::new(),
            skipped_count: 0,
            interrupted: false,
            elapsed: Duration::ZERO,
            seed_urls,
            sitemap_url: None,
            max_depth,
            output_format,
            config_hash: None,
        }
    }

    pub fn successful_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.pages.len() - self.successful_count()
    }

    /// Pages fetched so far, successful or not
    pub fn attempted_count(&self) -> usize {
        self.pages.len()
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &CrawledPage> {
        self.pages.iter().filter(|p| !p.is_success())
    }
}
