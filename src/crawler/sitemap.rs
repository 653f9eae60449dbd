//! Sitemap parsing
//!
//! Reads `<urlset>` and `<sitemapindex>` documents with `quick-xml`. Index files are
//! followed through the fetcher up to [`MAX_SITEMAP_NESTING`] levels deep.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Pacer;
use crate::url::normalize_url;
use crate::WebdownError;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// How many levels of sitemap index files are followed
pub const MAX_SITEMAP_NESTING: usize = 3;

/// Namespaces accepted for sitemap elements, besides no namespace at all
const SITEMAP_NAMESPACES: &[&[u8]] = &[
    b"http://www.sitemaps.org/schemas/sitemap/0.9",
    b"https://www.sitemaps.org/schemas/sitemap/0.9",
    b"http://www.google.com/schemas/sitemap/0.84",
];

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sitemap {
    /// `<urlset>`: page URLs
    UrlSet(Vec<Url>),
    /// `<sitemapindex>`: URLs of further sitemaps
    Index(Vec<Url>),
}

/// Parses a sitemap document
///
/// `<loc>` values that are not absolute http(s) URLs are dropped silently; duplicates
/// are reported once, in first-seen order.
///
/// # Errors
///
/// Returns a message when the document is not well-formed XML or has neither a
/// `<urlset>` nor a `<sitemapindex>` root.
///
/// # Example
///
/// ```
/// use webdown::crawler::{parse_sitemap, Sitemap};
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/a</loc></url>
///   <url><loc>not a url</loc></url>
/// </urlset>"#;
/// match parse_sitemap(xml).unwrap() {
///     Sitemap::UrlSet(urls) => assert_eq!(urls.len(), 1),
///     Sitemap::Index(_) => unreachable!(),
/// }
/// ```
pub fn parse_sitemap(xml: &str) -> Result<Sitemap, String> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = None;
    let mut open: Vec<Element> = Vec::new();
    let mut current = String::new();
    let mut locs: Vec<Url> = Vec::new();
    let mut seen = HashSet::new();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| format!("malformed XML: {}", e))?;

        match event {
            Event::Start(e) => {
                let element = classify(&ns, e.local_name().as_ref(), open.last().copied());
                if open.is_empty() {
                    root.get_or_insert(element);
                }
                if element == Element::Loc {
                    current.clear();
                }
                open.push(element);
            }
            Event::Text(t) if open.last() == Some(&Element::Loc) => {
                let text = t.unescape().map_err(|e| format!("bad escape in <loc>: {}", e))?;
                current.push_str(&text);
            }
            Event::CData(c) if open.last() == Some(&Element::Loc) => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                if open.pop() == Some(Element::Loc) {
                    match normalize_url(current.trim()) {
                        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                            if seen.insert(url.as_str().to_string()) {
                                locs.push(url);
                            }
                        }
                        _ => debug!("Ignoring malformed sitemap entry: {:?}", current.trim()),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(Element::SitemapIndex) => Ok(Sitemap::Index(locs)),
        Some(Element::UrlSet) => Ok(Sitemap::UrlSet(locs)),
        _ => Err("document has no <urlset> or <sitemapindex> element".to_string()),
    }
}

/// Sitemap elements the parser cares about; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    UrlSet,
    SitemapIndex,
    Url,
    Sitemap,
    Loc,
    Other,
}

/// Classifies an opening tag by its namespace, local name and enclosing element
///
/// `<loc>` only counts as a direct child of `<url>` or `<sitemap>`, so extension
/// elements such as `<image:loc>` are never taken for page URLs.
fn classify(ns: &ResolveResult, local: &[u8], parent: Option<Element>) -> Element {
    let in_sitemap_ns = match ns {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(uri) => SITEMAP_NAMESPACES.contains(&uri.as_ref()),
        ResolveResult::Unknown(_) => false,
    };
    if !in_sitemap_ns {
        return Element::Other;
    }

    match (parent, local) {
        (None, b"urlset") => Element::UrlSet,
        (None, b"sitemapindex") => Element::SitemapIndex,
        (Some(Element::UrlSet), b"url") => Element::Url,
        (Some(Element::SitemapIndex), b"sitemap") => Element::Sitemap,
        (Some(Element::Url | Element::Sitemap), b"loc") => Element::Loc,
        _ => Element::Other,
    }
}

/// Fetches a sitemap and returns every page URL it lists, following index files
///
/// The root sitemap must be retrievable and parseable; failures in nested sitemaps
/// are logged and skipped.
pub async fn load_sitemap(
    fetcher: &Fetcher,
    pacer: &mut Pacer,
    sitemap_url: &Url,
    cancel: &CancellationToken,
) -> Result<Vec<Url>, WebdownError> {
    let mut pages = Vec::new();
    let mut seen_pages = HashSet::new();
    let mut seen_sitemaps = HashSet::new();
    let mut pending = vec![(sitemap_url.clone(), 0usize)];

    while let Some((url, level)) = pending.pop() {
        if !seen_sitemaps.insert(url.as_str().to_string()) {
            continue;
        }
        if !pacer.wait(cancel).await {
            break;
        }

        let is_root = level == 0;
        let document = match fetch_sitemap(fetcher, &url).await {
            Ok(doc) => doc,
            Err(message) if is_root => {
                return Err(WebdownError::Sitemap {
                    url: url.to_string(),
                    message,
                })
            }
            Err(message) => {
                warn!("Skipping nested sitemap {}: {}", url, message);
                continue;
            }
        };

        match document {
            Sitemap::UrlSet(urls) => {
                debug!("Sitemap {} lists {} URLs", url, urls.len());
                for page in urls {
                    if seen_pages.insert(page.as_str().to_string()) {
                        pages.push(page);
                    }
                }
            }
            Sitemap::Index(children) => {
                if level + 1 > MAX_SITEMAP_NESTING {
                    warn!("Sitemap index {} nested too deeply, not following", url);
                    continue;
                }
                // Reverse so children are visited in listed order
                for child in children.into_iter().rev() {
                    pending.push((child, level + 1));
                }
            }
        }
    }

    Ok(pages)
}

async fn fetch_sitemap(fetcher: &Fetcher, url: &Url) -> Result<Sitemap, String> {
    let fetched = fetcher.fetch(url).await.map_err(|e| e.to_string())?;
    parse_sitemap(&fetched.text())
}
