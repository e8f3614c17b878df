use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GovernorConfig;
use crate::constants::{HEALTH_PROBE_USER_AGENT, HEALTH_SWEEP_CONCURRENCY};
use crate::error::{GovernorError, GovernorResult};
use crate::pool::proxy::Proxy;
use crate::pool::registry::ProxyRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    /// Derived, never set directly: >= 0.8 healthy, >= 0.5 degraded,
    /// below that unhealthy; no samples yet means unknown.
    pub fn from_success_rate(rate: Option<f64>) -> Self {
        match rate {
            None => HealthStatus::Unknown,
            Some(r) if r >= 0.8 => HealthStatus::Healthy,
            Some(r) if r >= 0.5 => HealthStatus::Degraded,
            Some(_) => HealthStatus::Unhealthy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub proxy_id: String,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub success_rate: f64,
}

pub struct HealthMonitor {
    registry: Arc<ProxyRegistry>,
    results: DashMap<String, HealthCheckResult>,
    consecutive_failures: DashMap<String, u32>,
    check_urls: Vec<String>,
    timeout: Duration,
    max_consecutive_failures: u32,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ProxyRegistry>, config: &GovernorConfig) -> Self {
        Self {
            registry,
            results: DashMap::new(),
            consecutive_failures: DashMap::new(),
            check_urls: config.health_check_urls.clone(),
            timeout: config.health_check_timeout(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }

    /// Probes the proxy against the configured check URLs and commits the
    /// outcome. A timeout counts as a failed check.
    pub async fn check_proxy_health(&self, proxy: &Proxy) -> GovernorResult<()> {
        let (success, latency_ms, error) = self.probe(proxy).await;

        let latency_msg = latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        tracing::info!(
            "[Health] Proxy {} ({}) check: {} (latency: {})",
            proxy.id,
            proxy.url(),
            if success { "ok" } else { "failed" },
            latency_msg
        );

        self.commit(&proxy.id, success, latency_ms, error.clone());

        if success {
            Ok(())
        } else {
            Err(GovernorError::HealthCheck(
                error.unwrap_or_else(|| format!("probe failed for {}", proxy.id)),
            ))
        }
    }

    // Network round-trip. No registry lock is held here.
    async fn probe(&self, proxy: &Proxy) -> (bool, Option<u64>, Option<String>) {
        let mut upstream = match reqwest::Proxy::all(proxy.url()) {
            Ok(p) => p,
            Err(e) => return (false, None, Some(format!("invalid proxy url: {}", e))),
        };
        if let Some(auth) = &proxy.auth {
            upstream = upstream.basic_auth(&auth.username, &auth.password);
        }

        let client = match Client::builder()
            .proxy(upstream)
            .timeout(self.timeout)
            .user_agent(HEALTH_PROBE_USER_AGENT)
            .build()
        {
            Ok(c) => c,
            Err(e) => return (false, None, Some(format!("client build failed: {}", e))),
        };

        let mut last_error = None;
        for url in &self.check_urls {
            let start = Instant::now();
            match client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return (true, Some(start.elapsed().as_millis() as u64), None);
                }
                Ok(resp) => {
                    last_error = Some(format!("status {} from {}", resp.status(), url));
                }
                Err(e) => {
                    last_error = Some(format!("{}: {}", url, e));
                }
            }
        }
        (false, None, last_error)
    }

    /// Caller feedback path: the dispatcher reports how a real routed
    /// request went, which feeds the same counters as a probe.
    pub fn record_outcome(&self, proxy_id: &str, success: bool, latency_ms: Option<u64>) {
        self.commit(proxy_id, success, latency_ms, None);
    }

    fn commit(&self, id: &str, success: bool, latency_ms: Option<u64>, error: Option<String>) {
        let max = self.max_consecutive_failures;
        let now = Utc::now();
        // The failure streak and the health flag are decided inside the same
        // registry critical section; concurrent commits serialize here.
        let committed = self.registry.with_proxy_mut(id, |proxy| {
            let failures = if success {
                self.consecutive_failures.remove(id);
                0
            } else {
                let mut entry = self.consecutive_failures.entry(id.to_string()).or_insert(0);
                *entry += 1;
                *entry
            };
            if success {
                proxy.success_count += 1;
                proxy.healthy = true;
                if latency_ms.is_some() {
                    proxy.latency_ms = latency_ms;
                }
            } else {
                proxy.fail_count += 1;
                if failures >= max {
                    proxy.healthy = false;
                }
            }
            proxy.last_check = Some(now);
            (proxy.success_rate(), failures)
        });

        // Proxy may have been removed between snapshot and commit.
        let Some((rate, failures)) = committed else {
            self.results.remove(id);
            return;
        };

        if !success && failures >= max {
            tracing::warn!(
                "[Health] Proxy {} marked unhealthy after {} consecutive failures",
                id,
                failures
            );
        }

        self.results.insert(
            id.to_string(),
            HealthCheckResult {
                proxy_id: id.to_string(),
                status: HealthStatus::from_success_rate(rate),
                latency_ms,
                error,
                checked_at: now,
                success_rate: rate.unwrap_or(0.0),
            },
        );
    }

    pub fn get_health_results(&self) -> HashMap<String, HealthCheckResult> {
        self.results
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect()
    }

    /// Probes every registered proxy with bounded fan-out. The registry lock
    /// is taken only to snapshot the list and to commit results.
    pub async fn sweep(&self) {
        let proxies = self.registry.snapshot();
        if proxies.is_empty() {
            return;
        }

        let results = stream::iter(proxies)
            .map(|proxy| async move {
                let outcome = self.probe(&proxy).await;
                (proxy.id, outcome)
            })
            .buffer_unordered(HEALTH_SWEEP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut failed = 0usize;
        let total = results.len();
        for (id, (success, latency_ms, error)) in results {
            if !success {
                failed += 1;
            }
            self.commit(&id, success, latency_ms, error);
        }
        tracing::info!("[Health] Sweep complete: {}/{} proxies ok", total - failed, total);
    }

    pub fn start_background_sweep(
        self: Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "[Health] Background sweep started (every {}s)",
                interval.as_secs()
            );
            loop {
                self.sweep().await;
                tokio::time::sleep(interval).await;
            }
        })
    }
}
