pub mod types;

use std::path::Path;

use crate::error::{ProviderError, Result};
use types::Config;

pub const ENV_API_URL: &str = "SITEMINDER_API_URL";
pub const ENV_API_KEY: &str = "SITEMINDER_API_KEY";
pub const ENV_USE_MOCK: &str = "SITEMINDER_USE_MOCK";
pub const ENV_WEBHOOK_SECRET: &str = "SITEMINDER_WEBHOOK_SECRET";

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ProviderError::Config(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yml::from_str(&content)?;
    Ok(config)
}

/// Overlay `SITEMINDER_*` settings read through `lookup` onto `config`.
///
/// The lookup is injected so callers (and tests) decide where values come
/// from; `main` passes `std::env::var`.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL) {
        config.provider.base_url = Some(url);
    }
    if let Some(key) = lookup(ENV_API_KEY) {
        config.provider.api_key = Some(key);
    }
    if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
        config.provider.webhook_secret = Some(secret);
    }
    if let Some(raw) = lookup(ENV_USE_MOCK) {
        config.provider.use_mock = parse_flag(&raw).ok_or_else(|| {
            ProviderError::Config(format!("{ENV_USE_MOCK} must be a boolean, got '{raw}'"))
        })?;
    }
    Ok(config)
}

/// Load the file at `path`, then apply process environment overrides.
pub fn load_config_with_env(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    apply_env_overrides(config, |name| std::env::var(name).ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
