use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Storefront origin, e.g. `https://spesaonline.esselunga.it`.
    pub base_url: String,
    pub user_agent: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Wall-clock deadline for one task attempt (a full catalog walk).
    pub task_timeout_secs: u64,
    pub max_concurrency: usize,
    /// Total attempts per task, including the first.
    pub max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub page_size: u32,
    pub item_ceiling: u64,
    pub inter_page_delay_ms: u64,
    pub stores_path: PathBuf,
    pub streets_path: PathBuf,
    pub output_dir: PathBuf,
}
