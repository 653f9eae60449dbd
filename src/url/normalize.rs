use crate::{UrlError, UrlResult};
use std::path::Path;
use url::Url;

/// Normalizes a URL according to webdown's comparison rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http`, `https` and `file` schemes
/// 3. Lowercase scheme and host, drop the scheme's default port (done by the parser)
/// 4. Remove the fragment (everything after #)
/// 5. Remove an empty query string (trailing ?)
///
/// Path case and trailing slashes are preserved: `/a` and `/a/` are different
/// resources on most servers.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or the scheme is not supported
///
/// # Examples
///
/// ```
/// use webdown::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/Docs/#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/Docs/");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    normalize_parsed(url)
}

/// Applies normalization to an already-parsed URL
pub fn normalize_parsed(mut url: Url) -> UrlResult<Url> {
    match url.scheme() {
        "http" | "https" => {
            if url.host_str().map_or(true, str::is_empty) {
                return Err(UrlError::MissingHost(url.to_string()));
            }
        }
        "file" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    url.set_fragment(None);
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Parses a seed given on the command line or in code
///
/// Accepts absolute `http(s)://` and `file://` URLs as well as paths to existing local
/// files, which are canonicalized and turned into `file://` URLs.
pub fn parse_seed(input: &str) -> UrlResult<Url> {
    let trimmed = input.trim();

    match Url::parse(trimmed) {
        // Single-letter schemes are Windows drive letters, not URLs
        Ok(url) if url.scheme().len() > 1 => normalize_parsed(url),
        _ => {
            let path = Path::new(trimmed);
            if !path.exists() {
                return Err(UrlError::Parse(format!(
                    "'{}' is neither a URL nor an existing file",
                    trimmed
                )));
            }
            let absolute = path
                .canonicalize()
                .map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;
            Url::from_file_path(&absolute)
                .map_err(|_| UrlError::Parse(format!("cannot express {} as a URL", trimmed)))
        }
    }
}
