//! Crawler module for page fetching and site traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and local file reads
//! - HTML parsing and link extraction
//! - The breadth-first frontier and request pacing
//! - Sitemap loading
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod sitemap;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchedPage, Fetcher};
pub use frontier::{Frontier, FrontierEntry, Pacer};
pub use parser::extract_links;
pub use sitemap::{load_sitemap, parse_sitemap, Sitemap, MAX_SITEMAP_NESTING};

use crate::config::{CrawlerConfig, FetchOptions, FormatOptions};
use crate::convert::{convert, Converted};
use crate::output::CrawlResult;
use crate::url::parse_seed;
use crate::{ConfigError, ConversionError, Result};
use tokio_util::sync::CancellationToken;

/// Runs a complete breadth-first crawl
///
/// This is the main entry point for crawling. It will:
/// 1. Prepare the output directory
/// 2. Fetch pages breadth-first from the seeds, pacing requests
/// 3. Convert and write each page
/// 4. Follow in-scope links up to the maximum depth
/// 5. Write the `index.json` manifest
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `cancel` - Cancelling this token stops the crawl; the manifest is still written
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Every attempted page, including failures
/// * `Err(WebdownError)` - Configuration or manifest failure
pub async fn crawl(
    config: CrawlerConfig,
    cancel: CancellationToken,
) -> Result<CrawlResult> {
    Coordinator::new(config, cancel)?.run().await
}

/// Fetches and converts every in-scope page listed in a sitemap
///
/// Links found on the pages are not followed. The first seed, if any, is the
/// scope reference; otherwise the sitemap URL is.
///
/// # Errors
///
/// * `WebdownError::Config` - Invalid sitemap URL or unusable output directory
/// * `WebdownError::Sitemap` - The root sitemap could not be fetched or parsed
pub async fn crawl_from_sitemap(
    sitemap_url: &str,
    config: CrawlerConfig,
    cancel: CancellationToken,
) -> Result<CrawlResult> {
    let sitemap_url = parse_seed(sitemap_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", sitemap_url, e)))?;
    Coordinator::new(config, cancel)?
        .run_sitemap(&sitemap_url)
        .await
}

/// Fetches one URL or local file and converts it
pub async fn convert_page(
    target: &str,
    format: &FormatOptions,
    fetch: &FetchOptions,
) -> Result<Converted> {
    let url = parse_seed(target)?;
    let fetcher = Fetcher::new(fetch)?;
    let page = fetcher.fetch(&url).await?;

    if !page.is_html() {
        let content_type = page.content_type.unwrap_or_default();
        return Err(ConversionError::UnsupportedContentType(content_type).into());
    }

    Ok(convert(&page.text(), &page.final_url, format)?)
}
