use crate::config::types::ScopePolicy;
use crate::url::parse_seed;
use crate::{ConfigError, ConfigResult};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Validates the crawler settings and returns the normalized seed URLs
pub fn validate_crawler_config(
    seeds: &[String],
    output_dir: &Path,
    scope: &ScopePolicy,
) -> ConfigResult<Vec<Url>> {
    validate_output_dir(output_dir)?;
    validate_scope(scope)?;

    let mut parsed = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let url = parse_seed(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", seed, e)))?;

        if let ScopePolicy::PathPrefix(prefix) = scope {
            if !url.path().starts_with(prefix.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "seed '{}' is outside path prefix '{}'",
                    url, prefix
                )));
            }
        }

        if !parsed.contains(&url) {
            parsed.push(url);
        }
    }

    Ok(parsed)
}

/// Converts the delay to a `Duration`, rejecting negative and non-finite values
pub fn validate_delay(seconds: f64) -> ConfigResult<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            seconds
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn validate_output_dir(output_dir: &Path) -> ConfigResult<()> {
    if output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if output_dir.exists() && !output_dir.is_dir() {
        return Err(ConfigError::OutputDir {
            path: output_dir.display().to_string(),
            message: "exists and is not a directory".to_string(),
        });
    }

    Ok(())
}

fn validate_scope(scope: &ScopePolicy) -> ConfigResult<()> {
    if let ScopePolicy::PathPrefix(prefix) = scope {
        if prefix.is_empty() {
            return Err(ConfigError::Validation(
                "path prefix cannot be empty".to_string(),
            ));
        }
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path prefix must start with '/', got '{}'",
                prefix
            )));
        }
    }
    Ok(())
}
