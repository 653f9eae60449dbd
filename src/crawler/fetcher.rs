//! Page fetcher
//!
//! This module retrieves page content for the crawler:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests over http(s), following redirects
//! - Reading `file://` URLs from the local filesystem
//! - Classifying failures into [`FetchError`] kinds

use crate::config::FetchOptions;
use crate::FetchError;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Content fetched for one URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,

    /// HTTP status code; `None` for local files
    pub status: Option<u16>,

    /// Content-Type header value, or the guessed type for local files
    pub content_type: Option<String>,

    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Whether the content should be treated as HTML
    ///
    /// A missing content type counts as HTML.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn len(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `options` - User agent and request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```
/// use webdown::config::FetchOptions;
/// use webdown::crawler::build_http_client;
///
/// let client = build_http_client(&FetchOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &FetchOptions) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches http(s) and `file://` URLs
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(options)?,
        })
    }

    /// Fetches a URL
    ///
    /// # Error Mapping
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | HTTP 404 / missing file | `NotFound` |
    /// | Other non-2xx | `Http { status }` |
    /// | Request timeout | `Timeout` |
    /// | Connection refused, DNS, TLS, body read | `Connection` |
    /// | File permission denied | `PermissionDenied` |
    /// | Other file errors | `Io` |
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => read_local(url).await,
            _ => Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
            }),
        }
    }

    async fn fetch_http(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        Ok(FetchedPage {
            final_url,
            status: Some(status.as_u16()),
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Reads a `file://` URL from disk
async fn read_local(url: &Url) -> Result<FetchedPage, FetchError> {
    let path = url.to_file_path().map_err(|_| FetchError::Io {
        path: url.to_string(),
        message: "not a local file path".to_string(),
    })?;

    let body = tokio::fs::read(&path).await.map_err(|e| {
        let path = path.display().to_string();
        match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound { url: path },
            std::io::ErrorKind::PermissionDenied => FetchError::PermissionDenied { path },
            _ => FetchError::Io {
                path,
                message: e.to_string(),
            },
        }
    })?;

    Ok(FetchedPage {
        final_url: url.clone(),
        status: None,
        content_type: Some(guess_content_type(&path, &body).to_string()),
        body,
    })
}

/// Guesses a content type for a local file from its extension and first bytes
fn guess_content_type(path: &Path, body: &[u8]) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm" | "xhtml") => "text/html",
        _ if body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<') => "text/html",
        _ => "text/plain",
    }
}

fn classify_reqwest_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Connection {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
