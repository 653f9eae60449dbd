//! Webdown: web pages to Markdown, one page or a whole site
//!
//! This crate fetches HTML (over HTTP or from local files), converts it to Markdown or
//! Claude XML, and can crawl a site breadth-first or from its sitemap, writing one file
//! per page plus an `index.json` manifest describing every attempt.

pub mod config;
pub mod convert;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for webdown operations
#[derive(Debug, Error)]
pub enum WebdownError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Sitemap error for {url}: {message}")]
    Sitemap { url: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
///
/// These are the only errors that abort a crawl before the first page is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Output directory {path} is not usable: {message}")]
    OutputDir { path: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Typed failure of a single fetch
///
/// HTTP fetches and local file reads share this type; the variants mirror the
/// failure kinds recorded in the manifest.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Unsupported URL scheme for {url}")]
    UnsupportedScheme { url: String },
}

impl FetchError {
    /// Short machine-readable failure kind, as written to the manifest
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection_error",
            Self::Http { .. } => "http_error",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Io { .. } => "io_error",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
        }
    }

    /// HTTP status carried by the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the page converter
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Result type alias for webdown operations
pub type Result<T> = std::result::Result<T, WebdownError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlerConfig, FormatOptions, OutputFormat, ScopePolicy};
pub use crawler::{crawl, crawl_from_sitemap};
pub use output::{CrawlResult, CrawledPage, PageStatus};
pub use crate::url::{in_scope, normalize_url};
