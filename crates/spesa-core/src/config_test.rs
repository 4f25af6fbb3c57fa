use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn assert_invalid(map: &HashMap<&str, &str>, expected_var: &str) {
    let result = build_app_config(lookup_from_map(map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == expected_var),
        "expected InvalidEnvVar({expected_var}), got: {result:?}"
    );
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "SPESA_ENV"));
}

#[test]
fn build_app_config_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.task_timeout_secs, 120);
    assert_eq!(cfg.max_concurrency, 10);
    assert_eq!(cfg.max_attempts, 3);
    assert_eq!(cfg.retry_backoff_base_ms, 1000);
    assert_eq!(cfg.retry_backoff_cap_ms, 30_000);
    assert_eq!(cfg.page_size, 99);
    assert_eq!(cfg.item_ceiling, 20_000);
    assert_eq!(cfg.inter_page_delay_ms, 0);
    assert_eq!(cfg.stores_path, PathBuf::from("./config/stores.yaml"));
    assert_eq!(cfg.streets_path, PathBuf::from("./config/streets.yaml"));
    assert_eq!(cfg.output_dir, PathBuf::from("./out"));
}

#[test]
fn build_app_config_overrides() {
    let mut map = HashMap::new();
    map.insert("SPESA_ENV", "production");
    map.insert("SPESA_BASE_URL", "http://127.0.0.1:8080/");
    map.insert("SPESA_MAX_CONCURRENCY", "20");
    map.insert("SPESA_MAX_ATTEMPTS", "2");
    map.insert("SPESA_PAGE_SIZE", "50");
    map.insert("SPESA_ITEM_CEILING", "500");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.base_url, "http://127.0.0.1:8080");
    assert_eq!(cfg.max_concurrency, 20);
    assert_eq!(cfg.max_attempts, 2);
    assert_eq!(cfg.page_size, 50);
    assert_eq!(cfg.item_ceiling, 500);
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("SPESA_REQUEST_TIMEOUT_SECS", "soon");
    assert_invalid(&map, "SPESA_REQUEST_TIMEOUT_SECS");
}

#[test]
fn build_app_config_rejects_zero_concurrency() {
    let mut map = HashMap::new();
    map.insert("SPESA_MAX_CONCURRENCY", "0");
    assert_invalid(&map, "SPESA_MAX_CONCURRENCY");
}

#[test]
fn build_app_config_rejects_zero_attempts() {
    let mut map = HashMap::new();
    map.insert("SPESA_MAX_ATTEMPTS", "0");
    assert_invalid(&map, "SPESA_MAX_ATTEMPTS");
}

#[test]
fn build_app_config_rejects_oversized_page() {
    let mut map = HashMap::new();
    map.insert("SPESA_PAGE_SIZE", "250");
    assert_invalid(&map, "SPESA_PAGE_SIZE");
}

#[test]
fn build_app_config_rejects_non_http_base_url() {
    let mut map = HashMap::new();
    map.insert("SPESA_BASE_URL", "ftp://example.com");
    assert_invalid(&map, "SPESA_BASE_URL");
}
