use std::net::IpAddr;
use url::Url;

/// Extracts the host from a URL, lowercased
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webdown::url::extract_host;
///
/// let url = Url::parse("https://Docs.Example.com/path").unwrap();
/// assert_eq!(extract_host(&url), Some("docs.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Host plus explicit port, the unit two URLs must share to be on the "same host"
pub fn host_and_port(url: &Url) -> Option<(String, Option<u16>)> {
    extract_host(url).map(|host| (host, url.port_or_known_default()))
}

/// Returns the registrable domain of a host
///
/// Looks the host up in the Public Suffix List, private entries included, so
/// `alice.github.io` and `bob.github.io` are separate sites. IP addresses and
/// hosts with no label left above a public suffix are returned whole.
///
/// # Examples
///
/// ```
/// use webdown::url::registrable_domain;
///
/// assert_eq!(registrable_domain("docs.example.com"), "example.com");
/// assert_eq!(registrable_domain("www.bbc.co.uk"), "bbc.co.uk");
/// assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}
