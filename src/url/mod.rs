//! URL handling for webdown
//!
//! This module provides:
//! - URL normalization, the single rule used wherever URLs are compared or stored
//! - Seed parsing (URLs or local paths)
//! - Host and registrable-domain helpers
//! - The scope filter deciding which discovered links may be queued

mod domain;
mod normalize;
mod scope;

pub use domain::{extract_host, host_and_port, registrable_domain};
pub use normalize::{normalize_parsed, normalize_url, parse_seed};
pub use scope::in_scope;
