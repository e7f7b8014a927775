//! Configuration loader.
//!
//! Loads runtime settings from environment variables, falling back to a
//! JSON or TOML file probed from the working directory.
//!
//! ## Environment variables
//! - `SOCIALHUB_DB_PATH`: database file path (required)
//! - `SOCIALHUB_DB_POOL_SIZE`: connection pool size (default 4)
//! - `SOCIALHUB_SWEEP_INTERVAL`: publish sweep interval in seconds
//! - `SOCIALHUB_SWEEP_BATCH_SIZE`: jobs advanced per sweep
//! - `SOCIALHUB_SWEEP_ENABLED`: whether the background sweep runs (true/false)
//! - `SOCIALHUB_REDIRECT_URI`: OAuth redirect URI registered with the Meta app (required)
//! - `SOCIALHUB_APP_BASE_URL`: base URL for post-callback redirects (required)
//!
//! ## File locations
//! `./config.json`, `./config.toml`, `./socialhub.json`, `./socialhub.toml`,
//! then the same names one and two directories up.

use std::path::{Path, PathBuf};

use socialhub_domain::{Config, DatabaseConfig, OAuthConfig, Result, SocialHubError, SweepConfig};

const DEFAULT_POOL_SIZE: u32 = 4;

/// Load configuration with automatic fallback strategy.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(err) => {
            tracing::debug!(error = %err, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
pub fn load_from_env() -> Result<Config> {
    let defaults = SweepConfig::default();
    Ok(Config {
        database: DatabaseConfig {
            path: env_var("SOCIALHUB_DB_PATH")?,
            pool_size: env_parse("SOCIALHUB_DB_POOL_SIZE")?.unwrap_or(DEFAULT_POOL_SIZE),
        },
        sweep: SweepConfig {
            interval_seconds: env_parse("SOCIALHUB_SWEEP_INTERVAL")?
                .unwrap_or(defaults.interval_seconds),
            batch_size: env_parse("SOCIALHUB_SWEEP_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            enabled: env_bool("SOCIALHUB_SWEEP_ENABLED", defaults.enabled),
        },
        oauth: OAuthConfig {
            redirect_uri: env_var("SOCIALHUB_REDIRECT_URI")?,
            app_base_url: env_var("SOCIALHUB_APP_BASE_URL")?,
        },
    })
}

/// Load configuration from a file, probing standard locations when no path
/// is given. Format is chosen by extension: `.toml` parses as TOML,
/// everything else as JSON.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SocialHubError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SocialHubError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|err| {
        SocialHubError::Config(format!("failed to read {}: {err}", config_path.display()))
    })?;
    let config = parse_config(&config_path, &contents)?;

    tracing::info!(path = %config_path.display(), "configuration loaded from file");
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(contents)
            .map_err(|err| SocialHubError::Config(format!("invalid TOML config: {err}")))
    } else {
        serde_json::from_str(contents)
            .map_err(|err| SocialHubError::Config(format!("invalid JSON config: {err}")))
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.json", "config.toml", "socialhub.json", "socialhub.toml"];
    let prefixes = ["", "..", "../.."];

    for prefix in prefixes {
        for name in names {
            let candidate = if prefix.is_empty() {
                PathBuf::from(name)
            } else {
                Path::new(prefix).join(name)
            };
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| SocialHubError::Config(format!("missing environment variable {name}")))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| SocialHubError::Config(format!("invalid {name}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
