/// Configuration utilities - loading, environment overrides and validation
///
/// Configuration is loaded once by the binary and handed to `Gateway::new`;
/// there is no process-wide config singleton.
use super::schemas::Config;
use crate::arguments;
use crate::logger::{self, LogTag};
use crate::paths;
use std::path::Path;

pub const CMC_API_KEY_ENV: &str = "CMC_API_KEY";
pub const COINGECKO_API_KEY_ENV: &str = "COINGECKO_API_KEY";

const CACHE_BACKENDS: [&str; 2] = ["memory", "sqlite"];

/// Load configuration from `--config <path>` or the default data-dir location
pub fn load_config() -> Result<Config, String> {
    match arguments::get_config_path_override() {
        Some(path) => load_config_from_path(&path),
        None => load_config_from_path(&paths::get_config_path().to_string_lossy()),
    }
}

/// Load configuration from a specific TOML file
///
/// A missing file is not an error: defaults are used. Environment overrides
/// are applied and the result is validated before returning.
pub fn load_config_from_path(path: &str) -> Result<Config, String> {
    let mut config = if Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;
        let config = parse_config(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?;
        logger::info(LogTag::Config, &format!("Loaded configuration from {}", path));
        config
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        Config::default()
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str::<Config>(contents).map_err(|e| e.to_string())
}

/// Fill empty API keys from the environment
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let providers = &mut config.providers;
    if providers.coinmarketcap.api_key.is_empty() {
        if let Some(key) = lookup(CMC_API_KEY_ENV) {
            providers.coinmarketcap.api_key = key;
        }
    }
    if providers.coingecko.api_key.is_empty() {
        if let Some(key) = lookup(COINGECKO_API_KEY_ENV) {
            providers.coingecko.api_key = key;
        }
    }
}

pub fn validate_config(config: &Config) -> Result<(), String> {
    let providers = &config.providers;
    let timeouts = [
        ("coinmarketcap", providers.coinmarketcap.timeout_secs),
        ("coingecko", providers.coingecko.timeout_secs),
        ("dexscreener", providers.dexscreener.timeout_secs),
    ];
    for (name, timeout) in timeouts {
        if timeout == 0 {
            return Err(format!("providers.{}.timeout_secs must be greater than zero", name));
        }
    }

    if !CACHE_BACKENDS.contains(&config.cache.backend.as_str()) {
        return Err(format!(
            "cache.backend must be one of {:?}, got '{}'",
            CACHE_BACKENDS, config.cache.backend
        ));
    }

    let scheduler = &config.scheduler;
    let intervals = [
        ("discovery_interval_secs", scheduler.discovery_interval_secs),
        ("analysis_interval_secs", scheduler.analysis_interval_secs),
        ("reprime_interval_secs", scheduler.reprime_interval_secs),
        ("cache_sweep_interval_secs", scheduler.cache_sweep_interval_secs),
    ];
    for (name, interval) in intervals {
        if interval == 0 {
            return Err(format!("scheduler.{} must be greater than zero", name));
        }
    }

    if config.votes.max_key_length == 0 {
        return Err("votes.max_key_length must be greater than zero".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [providers.coinmarketcap]
            api_key = "abc"

            [cache]
            coalesce_misses = true
            "#,
        )
        .unwrap();

        assert_eq!(config.providers.coinmarketcap.api_key, "abc");
        assert_eq!(config.providers.coinmarketcap.min_interval_ms, 1500);
        assert_eq!(config.providers.dexscreener.timeout_secs, 10);
        assert!(config.cache.coalesce_misses);
        assert_eq!(config.cache.backend, "memory");
    }

    #[test]
    fn test_env_override_only_fills_empty_keys() {
        let mut config = Config::default();
        config.providers.coingecko.api_key = "from-file".to_string();

        apply_env_overrides(&mut config, |name| Some(format!("env-{}", name)));

        assert_eq!(config.providers.coinmarketcap.api_key, "env-CMC_API_KEY");
        assert_eq!(config.providers.coingecko.api_key, "from-file");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        assert!(validate_config(&config).is_ok());

        config.cache.backend = "redis".to_string();
        assert!(validate_config(&config).unwrap_err().contains("cache.backend"));

        let mut config = Config::default();
        config.providers.dexscreener.timeout_secs = 0;
        assert!(validate_config(&config).unwrap_err().contains("dexscreener"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from_path("/nonexistent/coinvote/config.toml").unwrap();
        assert_eq!(config.scheduler.discovery_interval_secs, 900);
    }
}
