use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymityLevel {
    Transparent,
    Anonymous,
    Elite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// One egress point. Health and cost fields are mutated only under the
/// registry lock, by the health monitor and cost optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
    #[serde(default)]
    pub auth: Option<ProxyAuth>,
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    pub cost_per_request: f64,
    pub cost_per_gb: f64,
    pub max_concurrency: u32,
    #[serde(default)]
    pub current_load: u32,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub fail_count: u64,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub healthy: bool,
    pub anonymity: AnonymityLevel,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
}

impl Proxy {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    /// Rolling success rate over all recorded probe/request outcomes.
    /// `None` until at least one outcome exists.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.success_count + self.fail_count;
        if total == 0 {
            None
        } else {
            Some(self.success_count as f64 / total as f64)
        }
    }
}

/// Regionally-scoped grouping of proxies; the unit the load balancer
/// chooses between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPool {
    pub name: String,
    pub region: String,
    pub proxies: Vec<Proxy>,
    /// Average per-request cost across the pool's proxies.
    pub cost_per_request: f64,
}

impl ProxyPool {
    pub fn total_load(&self) -> u64 {
        self.proxies.iter().map(|p| p.current_load as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_proxy;

    #[test]
    fn url_includes_scheme_host_port() {
        let mut proxy = sample_proxy("p1", "us-east");
        assert_eq!(proxy.url(), "http://10.0.0.1:8080");
        proxy.protocol = ProxyProtocol::Socks5;
        assert_eq!(proxy.url(), "socks5://10.0.0.1:8080");
    }

    #[test]
    fn success_rate_is_none_without_samples() {
        let mut proxy = sample_proxy("p1", "us-east");
        assert_eq!(proxy.success_rate(), None);
        proxy.success_count = 3;
        proxy.fail_count = 1;
        assert_eq!(proxy.success_rate(), Some(0.75));
    }
}
