use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://spesaonline.esselunga.it";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// Upper bound accepted for `SPESA_PAGE_SIZE`; the search endpoint silently
/// truncates larger pages.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("SPESA_ENV", "development"))?;
    let log_level = or_default("SPESA_LOG_LEVEL", "info");
    let base_url = or_default("SPESA_BASE_URL", DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SPESA_BASE_URL".to_string(),
            reason: format!("\"{base_url}\" is not an http(s) URL"),
        });
    }
    let user_agent = or_default("SPESA_USER_AGENT", DEFAULT_USER_AGENT);

    let request_timeout_secs = parse_var(&or_default, "SPESA_REQUEST_TIMEOUT_SECS", "30")?;
    let task_timeout_secs = parse_var(&or_default, "SPESA_TASK_TIMEOUT_SECS", "120")?;
    let max_concurrency: usize = parse_var(&or_default, "SPESA_MAX_CONCURRENCY", "10")?;
    let max_attempts: u32 = parse_var(&or_default, "SPESA_MAX_ATTEMPTS", "3")?;
    let retry_backoff_base_ms = parse_var(&or_default, "SPESA_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retry_backoff_cap_ms = parse_var(&or_default, "SPESA_RETRY_BACKOFF_CAP_MS", "30000")?;
    let page_size: u32 = parse_var(&or_default, "SPESA_PAGE_SIZE", "99")?;
    let item_ceiling = parse_var(&or_default, "SPESA_ITEM_CEILING", "20000")?;
    let inter_page_delay_ms = parse_var(&or_default, "SPESA_INTER_PAGE_DELAY_MS", "0")?;

    require_positive("SPESA_MAX_CONCURRENCY", max_concurrency)?;
    require_positive("SPESA_MAX_ATTEMPTS", max_attempts)?;
    require_positive("SPESA_PAGE_SIZE", page_size)?;
    if page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar {
            var: "SPESA_PAGE_SIZE".to_string(),
            reason: format!("must be at most {MAX_PAGE_SIZE}, got {page_size}"),
        });
    }

    let stores_path = PathBuf::from(or_default("SPESA_STORES_PATH", "./config/stores.yaml"));
    let streets_path = PathBuf::from(or_default("SPESA_STREETS_PATH", "./config/streets.yaml"));
    let output_dir = PathBuf::from(or_default("SPESA_OUTPUT_DIR", "./out"));

    Ok(AppConfig {
        env,
        log_level,
        base_url,
        user_agent,
        request_timeout_secs,
        task_timeout_secs,
        max_concurrency,
        max_attempts,
        retry_backoff_base_ms,
        retry_backoff_cap_ms,
        page_size,
        item_ceiling,
        inter_page_delay_ms,
        stores_path,
        streets_path,
        output_dir,
    })
}

fn parse_var<T, D>(or_default: &D, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: Fn(&str, &str) -> String,
{
    let raw = or_default(var, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn require_positive<T: PartialEq + Default>(var: &str, value: T) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SPESA_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
