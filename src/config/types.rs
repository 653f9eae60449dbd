use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::config::validation::{validate_crawler_config, validate_delay};
use crate::ConfigError;

/// Default crawl depth from the seeds
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default pause between two requests, in seconds
pub const DEFAULT_DELAY_SECONDS: f64 = 1.0;

/// Default request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Root tag used for Claude XML documents
pub const CLAUDE_DOC_TAG: &str = "claude_documentation";

/// Rule deciding whether a discovered link may be queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePolicy {
    /// Same registrable domain as the seed; subdomains allowed
    SameDomain,
    /// Exactly the seed's host
    SameSubdomain,
    /// Seed's host, path starting with the prefix
    PathPrefix(String),
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self::SameSubdomain
    }
}

impl std::fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameDomain => write!(f, "same-domain"),
            Self::SameSubdomain => write!(f, "same-subdomain"),
            Self::PathPrefix(prefix) => write!(f, "path-prefix({})", prefix),
        }
    }
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Markdown,
    ClaudeXml,
}

impl OutputFormat {
    /// File extension written for this format, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::ClaudeXml => "xml",
        }
    }

    /// Name recorded in the manifest
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::ClaudeXml => "claude-xml",
        }
    }
}

/// Options forwarded to the page converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: OutputFormat,
    pub include_toc: bool,
    /// Only convert the part of the page matching this selector
    pub css_selector: Option<String>,
    pub include_links: bool,
    pub include_images: bool,
    /// Collapse runs of blank lines
    pub compact: bool,
    /// Wrap paragraphs at this column; 0 disables wrapping
    pub width: usize,
    /// Claude XML only: emit the `<metadata>` block
    pub include_metadata: bool,
    /// Claude XML only: put today's date into the metadata
    pub add_date: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            include_toc: false,
            css_selector: None,
            include_links: true,
            include_images: true,
            compact: false,
            width: 0,
            include_metadata: true,
            add_date: true,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("webdown/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

/// Immutable configuration for one crawl run
///
/// Only obtainable through [`CrawlerConfig::builder`], so every instance has passed
/// validation.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    seeds: Vec<Url>,
    output_dir: PathBuf,
    max_depth: u32,
    delay: Duration,
    scope: ScopePolicy,
    max_pages: usize,
    format: FormatOptions,
    fetch: FetchOptions,
    quiet: bool,
    config_hash: Option<String>,
}

impl CrawlerConfig {
    /// Starts a builder writing into `output_dir`
    pub fn builder(output_dir: impl Into<PathBuf>) -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new(output_dir.into())
    }

    /// Normalized seed URLs, in the order given
    pub fn seeds(&self) -> &[Url] {
        &self.seeds
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn scope(&self) -> &ScopePolicy {
        &self.scope
    }

    /// Page budget; 0 means unlimited
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn format(&self) -> &FormatOptions {
        &self.format
    }

    pub fn fetch(&self) -> &FetchOptions {
        &self.fetch
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// SHA-256 of the TOML defaults file, when one was loaded
    pub fn config_hash(&self) -> Option<&str> {
        self.config_hash.as_deref()
    }
}

/// Builder for [`CrawlerConfig`]
#[derive(Debug, Clone)]
pub struct CrawlerConfigBuilder {
    seeds: Vec<String>,
    output_dir: PathBuf,
    max_depth: u32,
    delay_seconds: f64,
    scope: ScopePolicy,
    max_pages: usize,
    format: FormatOptions,
    fetch: FetchOptions,
    quiet: bool,
    config_hash: Option<String>,
}

impl CrawlerConfigBuilder {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            seeds: Vec::new(),
            output_dir,
            max_depth: DEFAULT_MAX_DEPTH,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            scope: ScopePolicy::default(),
            max_pages: 0,
            format: FormatOptions::default(),
            fetch: FetchOptions::default(),
            quiet: false,
            config_hash: None,
        }
    }

    pub fn seed(mut self, seed: impl Into<String>) -> Self {
        self.seeds.push(seed.into());
        self
    }

    pub fn seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds.extend(seeds.into_iter().map(Into::into));
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn delay_seconds(mut self, delay_seconds: f64) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    pub fn scope(mut self, scope: ScopePolicy) -> Self {
        self.scope = scope;
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    /// Mutable access to the format options, for layering file and CLI values
    pub fn format_mut(&mut self) -> &mut FormatOptions {
        &mut self.format
    }

    pub fn fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn fetch_mut(&mut self) -> &mut FetchOptions {
        &mut self.fetch
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Validates and builds a configuration for a link-following crawl
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the seed list is empty or any value is invalid.
    pub fn build(self) -> Result<CrawlerConfig, ConfigError> {
        if self.seeds.is_empty() {
            return Err(ConfigError::Validation(
                "at least one seed URL is required".to_string(),
            ));
        }
        self.finish()
    }

    /// Validates and builds a configuration for a sitemap crawl, where seeds are optional
    pub fn build_for_sitemap(self) -> Result<CrawlerConfig, ConfigError> {
        self.finish()
    }

    fn finish(self) -> Result<CrawlerConfig, ConfigError> {
        let delay = validate_delay(self.delay_seconds)?;
        let seeds = validate_crawler_config(&self.seeds, &self.output_dir, &self.scope)?;

        Ok(CrawlerConfig {
            seeds,
            output_dir: self.output_dir,
            max_depth: self.max_depth,
            delay,
            scope: self.scope,
            max_pages: self.max_pages,
            format: self.format,
            fetch: self.fetch,
            quiet: self.quiet,
            config_hash: self.config_hash,
        })
    }
}

/// Optional TOML defaults file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub crawler: CrawlerSection,
    #[serde(default)]
    pub conversion: ConversionSection,
}

/// `[crawler]` table of the defaults file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CrawlerSection {
    pub max_depth: Option<u32>,
    pub delay_seconds: Option<f64>,
    pub max_pages: Option<usize>,
    pub scope: Option<ScopeKind>,
    pub path_prefix: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Scope name as written in the defaults file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeKind {
    SameDomain,
    SameSubdomain,
    PathPrefix,
}

/// `[conversion]` table of the defaults file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConversionSection {
    pub format: Option<OutputFormat>,
    pub include_toc: Option<bool>,
    pub include_links: Option<bool>,
    pub include_images: Option<bool>,
    pub css_selector: Option<String>,
    pub compact: Option<bool>,
    pub width: Option<usize>,
    pub include_metadata: Option<bool>,
    pub add_date: Option<bool>,
}

impl FileConfig {
    /// Resolves the scope named in the file, if any
    pub fn scope(&self) -> Result<Option<ScopePolicy>, ConfigError> {
        let section = &self.crawler;
        match (section.scope, &section.path_prefix) {
            (None, None) => Ok(None),
            (Some(ScopeKind::SameDomain), _) => Ok(Some(ScopePolicy::SameDomain)),
            (Some(ScopeKind::SameSubdomain), _) => Ok(Some(ScopePolicy::SameSubdomain)),
            (Some(ScopeKind::PathPrefix) | None, Some(prefix)) => {
                Ok(Some(ScopePolicy::PathPrefix(prefix.clone())))
            }
            (Some(ScopeKind::PathPrefix), None) => Err(ConfigError::Validation(
                "scope = \"path-prefix\" requires a path-prefix value".to_string(),
            )),
        }
    }

    /// Applies the file's values onto format options
    pub fn apply_format(&self, options: &mut FormatOptions) {
        let c = &self.conversion;
        if let Some(format) = c.format {
            options.format = format;
        }
        if let Some(v) = c.include_toc {
            options.include_toc = v;
        }
        if let Some(v) = c.include_links {
            options.include_links = v;
        }
        if let Some(v) = c.include_images {
            options.include_images = v;
        }
        if let Some(selector) = &c.css_selector {
            options.css_selector = Some(selector.clone());
        }
        if let Some(v) = c.compact {
            options.compact = v;
        }
        if let Some(v) = c.width {
            options.width = v;
        }
        if let Some(v) = c.include_metadata {
            options.include_metadata = v;
        }
        if let Some(v) = c.add_date {
            options.add_date = v;
        }
    }

    /// Applies the file's values onto fetch options
    pub fn apply_fetch(&self, options: &mut FetchOptions) {
        if let Some(agent) = &self.crawler.user_agent {
            options.user_agent = agent.clone();
        }
        if let Some(secs) = self.crawler.timeout_seconds {
            options.timeout = Duration::from_secs(secs);
        }
    }

    /// Seeds a builder with every crawler value present in the file
    pub fn apply(&self, mut builder: CrawlerConfigBuilder) -> Result<CrawlerConfigBuilder, ConfigError> {
        if let Some(depth) = self.crawler.max_depth {
            builder = builder.max_depth(depth);
        }
        if let Some(delay) = self.crawler.delay_seconds {
            builder = builder.delay_seconds(delay);
        }
        if let Some(pages) = self.crawler.max_pages {
            builder = builder.max_pages(pages);
        }
        if let Some(scope) = self.scope()? {
            builder = builder.scope(scope);
        }
        self.apply_format(builder.format_mut());
        self.apply_fetch(builder.fetch_mut());
        Ok(builder)
    }
}
