use crate::config::types::FileConfig;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a TOML defaults file
///
/// # Arguments
///
/// * `path` - Path to the TOML file
///
/// # Returns
///
/// * `Ok(FileConfig)` - Parsed file; every value is optional
/// * `Err(ConfigError)` - Failed to read or parse the file, or its scope is inconsistent
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use webdown::config::load_config;
///
/// let file = load_config(Path::new("webdown.toml")).unwrap();
/// println!("Max depth: {:?}", file.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<FileConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;

    // Surface a dangling `scope = "path-prefix"` at load time
    config.scope()?;

    Ok(config)
}

/// Computes a SHA-256 hash of the file content, hex encoded
///
/// Recorded in the manifest so two crawls can be told apart by their settings.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a defaults file and returns it together with its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(FileConfig, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
