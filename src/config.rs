use crate::client::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "WITHDRAW_API_URL";

/// Default API base URL used when neither config nor env provide one
pub const DEFAULT_BASE_URL: &str = "https://api.example.com/v1";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "withdraw-flow.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            enable_tracing: true,
            api: ApiConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

/// Withdrawals API endpoint and transport retry settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10000,
        }
    }
}

impl ApiConfig {
    /// Base URL with the `WITHDRAW_API_URL` env override applied
    pub fn resolved_base_url(&self) -> String {
        std::env::var(BASE_URL_ENV).unwrap_or_else(|_| self.base_url.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Coordinator polling and snapshot settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoordinatorConfig {
    /// Status poll interval
    pub poll_interval_ms: u64,
    /// Persisted snapshots older than this are treated as absent
    pub snapshot_expiration_secs: u64,
    /// Path of the persisted snapshot blob
    pub snapshot_path: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            snapshot_expiration_secs: 300, // 5 minutes
            snapshot_path: "./data/withdraw-snapshot.json".to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn snapshot_expiration(&self) -> Duration {
        Duration::from_secs(self.snapshot_expiration_secs)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
