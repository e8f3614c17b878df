use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::DEFAULT_HEALTH_CHECK_URLS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub per_minute: u64,
    pub per_hour: u64,
    pub per_day: u64,
}

impl QuotaLimits {
    pub fn new(per_minute: u64, per_hour: u64, per_day: u64) -> Self {
        Self {
            per_minute,
            per_hour,
            per_day,
        }
    }
}

fn default_global_limits() -> QuotaLimits {
    QuotaLimits::new(300, 10_000, 100_000)
}

fn default_engine_limits() -> QuotaLimits {
    QuotaLimits::new(60, 1_000, 10_000)
}

fn default_global_concurrency_cap() -> u64 {
    100
}

fn default_engine_concurrency_cap() -> u64 {
    10
}

fn default_alert_threshold() -> f64 {
    0.8
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_health_check_timeout_secs() -> u64 {
    10
}

fn default_health_check_urls() -> Vec<String> {
    DEFAULT_HEALTH_CHECK_URLS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_health_check_interval_secs() -> u64 {
    300
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_budget_limit() -> f64 {
    100.0
}

fn default_strategy() -> String {
    "round_robin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    #[serde(default = "default_global_limits")]
    pub global_limits: QuotaLimits,
    #[serde(default = "default_engine_limits")]
    pub default_engine_limits: QuotaLimits,
    #[serde(default = "default_global_concurrency_cap")]
    pub global_concurrency_cap: u64,
    #[serde(default = "default_engine_concurrency_cap")]
    pub default_engine_concurrency_cap: u64,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
    #[serde(default = "default_health_check_urls")]
    pub health_check_urls: Vec<String>,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_budget_limit")]
    pub budget_limit: f64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            global_limits: default_global_limits(),
            default_engine_limits: default_engine_limits(),
            global_concurrency_cap: default_global_concurrency_cap(),
            default_engine_concurrency_cap: default_engine_concurrency_cap(),
            alert_threshold: default_alert_threshold(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retries: default_max_retries(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
            health_check_urls: default_health_check_urls(),
            health_check_interval_secs: default_health_check_interval_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
            budget_limit: default_budget_limit(),
            strategy: default_strategy(),
        }
    }
}

impl GovernorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}
