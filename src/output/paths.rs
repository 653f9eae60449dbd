//! URL to file path mapping
//!
//! [`url_to_filepath`] is a pure function of the URL; [`OutputManager`] adds a
//! per-crawl registry so two distinct URLs never share a file.

use crate::config::OutputFormat;
use crate::output::types::{OutputError, OutputResult};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Longest file name segment written, in bytes
const MAX_SEGMENT_BYTES: usize = 200;

/// Directory used for `file://` URLs, which have no host
const LOCAL_DIR: &str = "local";

/// Maps a URL to its output file path under `output_dir`
///
/// # Mapping Rules
///
/// - `<host>[_<port>]` becomes the first directory (`local` for files)
/// - `.`, `..` and empty path segments are dropped, so the result never leaves
///   `output_dir`
/// - A trailing slash or empty path maps to `index`
/// - A `.html`/`.htm` suffix is replaced by the format's extension
/// - A query string adds `_q<hash>` to the file stem
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use webdown::config::OutputFormat;
/// use webdown::output::url_to_filepath;
///
/// let url = Url::parse("https://example.com/docs/intro.html").unwrap();
/// let path = url_to_filepath(&url, Path::new("out"), OutputFormat::Markdown);
/// assert_eq!(path, Path::new("out/example.com/docs/intro.md"));
/// ```
pub fn url_to_filepath(url: &Url, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let mut path = output_dir.join(host_dir(url));

    let raw_path = url.path();
    let mut segments: Vec<String> = raw_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect();

    if segments.is_empty() || raw_path.ends_with('/') {
        segments.push("index".to_string());
    }

    let mut stem = segments.pop().unwrap_or_else(|| "index".to_string());
    stem = strip_html_suffix(&stem).to_string();
    if stem.is_empty() {
        stem = "index".to_string();
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        stem = format!("{}_q{}", stem, short_hash(query));
    }

    for segment in segments {
        path.push(segment);
    }
    path.push(format!("{}.{}", stem, format.extension()));
    path
}

fn host_dir(url: &Url) -> String {
    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let host = sanitize_segment(&host.to_lowercase());
            match url.port() {
                Some(port) => format!("{}_{}", host, port),
                None => host,
            }
        }
        _ => LOCAL_DIR.to_string(),
    }
}

/// Replaces characters that are unsafe in file names and truncates to 200 bytes
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.len() <= MAX_SEGMENT_BYTES {
        return cleaned;
    }

    let mut end = MAX_SEGMENT_BYTES;
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_string()
}

fn strip_html_suffix(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for suffix in [".html", ".htm"] {
        if lower.ends_with(suffix) {
            return &name[..name.len() - suffix.len()];
        }
    }
    name
}

/// First 8 hex characters of the SHA-256 of `input`
fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

/// Appends `-<hash>` to the file stem of `path`
fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };
    path.with_file_name(name)
}

/// Owns the output directory for one crawl
///
/// Assigns each URL a unique path, writes converted pages and the manifest.
#[derive(Debug)]
pub struct OutputManager {
    output_dir: PathBuf,
    format: OutputFormat,
    /// path -> URL that claimed it
    claimed: HashMap<PathBuf, String>,
    /// URL -> assigned path
    assigned: HashMap<String, PathBuf>,
}

/// Empty file written once to check the output directory accepts writes
const WRITE_TEST_FILE: &str = ".webdown-write-test";

impl OutputManager {
    /// Creates the output directory and checks that it is writable
    ///
    /// # Errors
    ///
    /// `ConfigError::OutputDir` when the directory cannot be created or written to.
    pub fn prepare(output_dir: &Path, format: OutputFormat) -> Result<Self, ConfigError> {
        let fail = |message: String| ConfigError::OutputDir {
            path: output_dir.display().to_string(),
            message,
        };

        std::fs::create_dir_all(output_dir).map_err(|e| fail(e.to_string()))?;

        let marker = output_dir.join(WRITE_TEST_FILE);
        std::fs::write(&marker, b"").map_err(|e| fail(e.to_string()))?;
        if let Err(e) = std::fs::remove_file(&marker) {
            debug!("Could not remove {}: {}", marker.display(), e);
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            format,
            claimed: HashMap::new(),
            assigned: HashMap::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the path for `url`, the same one every time it is asked
    ///
    /// If the natural path is already taken by another URL, a hash of the URL is
    /// appended to the file stem.
    pub fn assign_path(&mut self, url: &Url) -> PathBuf {
        if let Some(path) = self.assigned.get(url.as_str()) {
            return path.clone();
        }

        let mut path = url_to_filepath(url, &self.output_dir, self.format);
        if self.claimed.contains_key(&path) {
            let renamed = with_stem_suffix(&path, &short_hash(url.as_str()));
            debug!(
                "Output path {} already used, writing {} to {}",
                path.display(),
                url,
                renamed.display()
            );
            path = renamed;
        }

        self.claimed.insert(path.clone(), url.to_string());
        self.assigned.insert(url.to_string(), path.clone());
        path
    }

    /// Writes `content` to `path`, creating parent directories
    ///
    /// # Returns
    ///
    /// Number of bytes written.
    pub fn write_page(&self, path: &Path, content: &str) -> OutputResult<u64> {
        if !path.starts_with(&self.output_dir) {
            return Err(OutputError::PathEscape(path.display().to_string()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        std::fs::write(path, content).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })?;

        Ok(content.len() as u64)
    }

    /// Path relative to the output directory, with `/` separators
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.output_dir).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}
