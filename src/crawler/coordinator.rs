//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties together:
//! - The FIFO frontier and visited set
//! - Pacing between requests
//! - Fetching, converting and writing each page
//! - Link discovery and scope filtering
//! - Cancellation and the final manifest
//!
//! Everything runs on one task: one page is fetched, converted and written at a time.

use crate::config::CrawlerConfig;
use crate::convert::convert;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry, Pacer};
use crate::crawler::parser::extract_links;
use crate::crawler::sitemap::load_sitemap;
use crate::output::{write_manifest, CrawlResult, CrawledPage, OutputManager};
use crate::url::{in_scope, normalize_parsed};
use crate::{ConfigError, ConversionError, FetchError, WebdownError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Owns all state of one crawl run
///
/// Created at crawl start, consumed by [`Coordinator::run`] or
/// [`Coordinator::run_sitemap`].
pub struct Coordinator {
    config: CrawlerConfig,
    fetcher: Fetcher,
    output: OutputManager,
    frontier: Frontier,
    pacer: Pacer,
    cancel: CancellationToken,
    /// URLs scope is checked against, indexed by `FrontierEntry::origin`
    origins: Vec<Url>,
    /// Out-of-scope URLs already counted as skipped
    rejected: HashSet<String>,
    /// Final URL of every written page, with its output path and title
    written: HashMap<String, (String, Option<String>)>,
    result: CrawlResult,
    started: Instant,
}

impl Coordinator {
    /// Creates a coordinator, preparing the output directory
    ///
    /// # Errors
    ///
    /// * `WebdownError::Config` - The output directory cannot be created or written
    /// * `WebdownError::Reqwest` - The HTTP client could not be built
    pub fn new(config: CrawlerConfig, cancel: CancellationToken) -> Result<Self, WebdownError> {
        let output = OutputManager::prepare(config.output_dir(), config.format().format)?;
        let fetcher = Fetcher::new(config.fetch())?;

        let mut result = CrawlResult::new(
            config.seeds().iter().map(Url::to_string).collect(),
            config.max_depth(),
            config.format().format,
        );
        result.config_hash = config.config_hash().map(str::to_string);

        Ok(Self {
            pacer: Pacer::new(config.delay()),
            fetcher,
            output,
            frontier: Frontier::new(),
            cancel,
            origins: Vec::new(),
            rejected: HashSet::new(),
            written: HashMap::new(),
            result,
            started: Instant::now(),
            config,
        })
    }

    /// Breadth-first crawl from the configured seeds
    pub async fn run(mut self) -> Result<CrawlResult, WebdownError> {
        if self.config.seeds().is_empty() {
            return Err(ConfigError::Validation("at least one seed URL is required".to_string()).into());
        }

        self.origins = self.config.seeds().to_vec();
        for (index, seed) in self.origins.iter().enumerate() {
            self.frontier.push_seed(seed.clone(), index);
        }

        info!(
            "Starting crawl: {} seed(s), max depth {}, scope {}, delay {:?}",
            self.origins.len(),
            self.config.max_depth(),
            self.config.scope(),
            self.config.delay()
        );

        self.drain(true).await;
        self.finish()
    }

    /// Fetches every in-scope URL listed by a sitemap, without following links
    pub async fn run_sitemap(mut self, sitemap_url: &Url) -> Result<CrawlResult, WebdownError> {
        self.result.sitemap_url = Some(sitemap_url.to_string());
        info!("Loading sitemap {}", sitemap_url);

        let urls = load_sitemap(&self.fetcher, &mut self.pacer, sitemap_url, &self.cancel).await?;
        info!("Sitemap lists {} URL(s)", urls.len());

        let reference = self
            .config
            .seeds()
            .first()
            .cloned()
            .unwrap_or_else(|| sitemap_url.clone());
        let filter = reference.host_str().is_some();
        if !filter {
            warn!("Sitemap is a local file and no seed was given; scope filtering disabled");
        }
        self.origins = vec![reference];

        for url in urls {
            if filter && !in_scope(&url, &self.origins[0], self.config.scope()) {
                debug!("Sitemap URL {} is out of scope", url);
                if self.rejected.insert(url.to_string()) {
                    self.result.skipped_count += 1;
                }
                continue;
            }
            self.frontier.push_seed(url, 0);
        }

        self.drain(false).await;
        self.finish()
    }

    fn budget_exhausted(&self) -> bool {
        let max_pages = self.config.max_pages();
        max_pages > 0 && self.result.attempted_count() >= max_pages
    }

    /// Main loop: pops entries until the frontier is empty, the page budget is spent or
    /// the crawl is cancelled
    async fn drain(&mut self, follow_links: bool) {
        while !self.budget_exhausted() {
            if self.cancel.is_cancelled() {
                self.mark_interrupted();
                break;
            }

            let Some(entry) = self.frontier.pop() else {
                debug!("Frontier is empty");
                break;
            };

            if entry.depth > self.config.max_depth() {
                debug!("Skipping {} at depth {}", entry.url, entry.depth);
                self.result.skipped_count += 1;
                continue;
            }

            if !self.pacer.wait(&self.cancel).await {
                self.mark_interrupted();
                break;
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => None,
                result = self.fetcher.fetch(&entry.url) => Some(result),
            };
            let Some(fetched) = fetched else {
                self.mark_interrupted();
                break;
            };

            let page = self
                .process(&entry, fetched, follow_links)
                .discovered_from(entry.discovered_from.as_ref());
            self.result.pages.push(page);

            let attempted = self.result.attempted_count();
            if attempted % 10 == 0 {
                info!(
                    "Progress: {} pages attempted, {} in frontier, {:.2} pages/sec",
                    attempted,
                    self.frontier.len(),
                    attempted as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON)
                );
            }
        }
    }

    fn mark_interrupted(&mut self) {
        if !self.result.interrupted {
            info!(
                "Crawl interrupted, {} URL(s) left in frontier",
                self.frontier.len()
            );
        }
        self.result.interrupted = true;
    }

    /// Turns one fetch outcome into a page record, discovering links on success
    fn process(
        &mut self,
        entry: &FrontierEntry,
        fetched: Result<FetchedPage, FetchError>,
        follow_links: bool,
    ) -> CrawledPage {
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("[!] {}: {}", entry.url, e);
                return CrawledPage::failure(entry.url.as_str(), entry.depth, e.kind(), e.to_string())
                    .with_http_status(e.status());
            }
        };

        let target = normalize_parsed(fetched.final_url.clone()).unwrap_or_else(|_| entry.url.clone());

        // A redirect target must not be fetched a second time under its own name
        if target != entry.url {
            self.frontier.mark_visited(&target);
        }

        // Redirected onto a page already written: point at that file instead
        if let Some((path, title)) = self.written.get(target.as_str()) {
            info!("[=] {} -> {} (same page as {})", entry.url, path, target);
            return CrawledPage::success(entry.url.as_str(), entry.depth, path.clone(), fetched.len())
                .with_title(title.clone())
                .with_http_status(fetched.status);
        }

        let html = fetched.text();
        let page = self.save(entry, &fetched, &html);

        if let Some(path) = &page.output_path {
            self.written
                .insert(target.to_string(), (path.clone(), page.title.clone()));
        }

        if follow_links && fetched.is_html() && entry.depth < self.config.max_depth() {
            self.discover_links(entry, &fetched.final_url, &html);
        }

        page
    }

    /// Converts and writes a fetched page
    fn save(&mut self, entry: &FrontierEntry, fetched: &FetchedPage, html: &str) -> CrawledPage {
        let url = &entry.url;
        let fail = |kind: &str, message: String| {
            warn!("[!] {}: {}", url, message);
            CrawledPage::failure(url.as_str(), entry.depth, kind, message)
                .with_http_status(fetched.status)
                .with_bytes(Some(fetched.len()))
        };

        if !fetched.is_html() {
            let content_type = fetched.content_type.clone().unwrap_or_default();
            return fail(
                "unsupported_content_type",
                ConversionError::UnsupportedContentType(content_type).to_string(),
            );
        }

        let converted = match convert(html, &fetched.final_url, self.config.format()) {
            Ok(converted) => converted,
            Err(e) => return fail("conversion_error", e.to_string()),
        };

        let path = self.output.assign_path(url);
        if let Err(e) = self.output.write_page(&path, &converted.content) {
            return fail("write_error", e.to_string());
        }

        let relative = self.output.relative(&path);
        info!("[+] {} -> {}", url, relative);

        CrawledPage::success(url.as_str(), entry.depth, relative, fetched.len())
            .with_title(converted.title)
            .with_http_status(fetched.status)
    }

    /// Enqueues the in-scope links of a page at the next depth, in document order
    fn discover_links(&mut self, entry: &FrontierEntry, base: &Url, html: &str) {
        let Some(origin) = self.origins.get(entry.origin) else {
            return;
        };

        let links = extract_links(html, base);
        let found = links.len();
        let mut queued = 0;

        for link in links {
            if self.frontier.is_visited(&link) {
                continue;
            }

            if !in_scope(&link, origin, self.config.scope()) {
                if self.rejected.insert(link.to_string()) {
                    debug!("Out of scope: {}", link);
                    self.result.skipped_count += 1;
                }
                continue;
            }

            let queued_entry = FrontierEntry {
                url: link,
                depth: entry.depth + 1,
                discovered_from: Some(entry.url.clone()),
                origin: entry.origin,
            };
            if self.frontier.push(queued_entry) {
                queued += 1;
            }
        }

        debug!(
            "{}: {} link(s) found, {} queued at depth {}",
            entry.url,
            found,
            queued,
            entry.depth + 1
        );
    }

    /// Stamps the result and writes the manifest
    fn finish(mut self) -> Result<CrawlResult, WebdownError> {
        self.result.finished_at = Utc::now();
        self.result.elapsed = self.started.elapsed();

        write_manifest(&self.result, self.output.output_dir())?;

        info!(
            "Crawl finished in {:.1}s: {} successful, {} failed, {} skipped",
            self.result.elapsed.as_secs_f64(),
            self.result.successful_count(),
            self.result.failed_count(),
            self.result.skipped_count
        );

        Ok(self.result)
    }
}
