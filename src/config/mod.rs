//! Configuration for webdown
//!
//! A crawl is described by an immutable [`CrawlerConfig`] built and validated through
//! [`CrawlerConfig::builder`]. Defaults can also come from an optional TOML file whose
//! values are layered under the command-line flags.
//!
//! # Example
//!
//! ```no_run
//! use webdown::config::{CrawlerConfig, ScopePolicy};
//!
//! let config = CrawlerConfig::builder("out")
//!     .seed("https://example.com/docs/")
//!     .scope(ScopePolicy::PathPrefix("/docs".to_string()))
//!     .max_depth(2)
//!     .build()
//!     .unwrap();
//! println!("Crawler will use max depth: {}", config.max_depth());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ConversionSection, CrawlerConfig, CrawlerConfigBuilder, CrawlerSection, FetchOptions,
    FileConfig, FormatOptions, OutputFormat, ScopeKind, ScopePolicy, CLAUDE_DOC_TAG,
    DEFAULT_DELAY_SECONDS, DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT_SECONDS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
