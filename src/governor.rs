use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GovernorConfig;
use crate::error::GovernorResult;
use crate::pool::balancer::{LoadBalanceStrategy, LoadBalancer};
use crate::pool::cost::CostOptimizer;
use crate::pool::health::{HealthCheckResult, HealthMonitor};
use crate::pool::proxy::{Proxy, ProxyPool};
use crate::pool::registry::ProxyRegistry;
use crate::pool::rotation::{RotationEngine, RotationEvent};
use crate::quota::arbiter::{
    EngineSettings, QuotaArbiter, QuotaRequest, QuotaResponse, QuotaStatus,
};

/// The explicit object graph: Registry -> HealthMonitor/CostOptimizer ->
/// LoadBalancer/Arbiter/RotationEngine, built once per process and handed
/// to the dispatcher by reference. No hidden singletons.
pub struct Governor {
    config: GovernorConfig,
    arbiter: QuotaArbiter,
    registry: Arc<ProxyRegistry>,
    health: Arc<HealthMonitor>,
    cost: CostOptimizer,
    balancer: LoadBalancer,
    rotation: RotationEngine,
}

impl Governor {
    pub fn new(config: GovernorConfig) -> GovernorResult<Self> {
        let strategy = LoadBalanceStrategy::parse(&config.strategy)?;
        let registry = Arc::new(ProxyRegistry::new());
        let health = Arc::new(HealthMonitor::new(registry.clone(), &config));
        let cost = CostOptimizer::new(config.budget_limit);
        let arbiter = QuotaArbiter::new(config.clone());

        Ok(Self {
            arbiter,
            registry,
            health,
            cost,
            balancer: LoadBalancer::new(strategy),
            rotation: RotationEngine::new(strategy),
            config,
        })
    }

    // --- admission control ---

    pub fn request_quota(&self, req: &QuotaRequest) -> GovernorResult<QuotaResponse> {
        self.arbiter.request_quota(req)
    }

    pub fn release_quota(&self, engine: &str, request_id: &str) -> GovernorResult<()> {
        self.arbiter.release_quota(engine, request_id)
    }

    pub fn get_available_engines(&self) -> Vec<String> {
        self.arbiter.get_available_engines()
    }

    pub fn get_fallback_engine(&self, name: &str) -> Option<String> {
        self.arbiter.get_fallback_engine(name)
    }

    pub fn get_quota_status(&self) -> QuotaStatus {
        self.arbiter.get_quota_status()
    }

    pub fn add_engine(&self, settings: EngineSettings) -> GovernorResult<()> {
        self.arbiter.add_engine(settings)
    }

    pub fn update_engine(&self, settings: EngineSettings) -> GovernorResult<()> {
        self.arbiter.update_engine(settings)
    }

    pub fn remove_engine(&self, name: &str) -> GovernorResult<()> {
        self.arbiter.remove_engine(name)
    }

    pub fn enable_engine(&self, name: &str) -> GovernorResult<()> {
        self.arbiter.enable_engine(name)
    }

    pub fn disable_engine(&self, name: &str) -> GovernorResult<()> {
        self.arbiter.disable_engine(name)
    }

    pub fn reset_quotas(&self) {
        self.arbiter.reset_quotas()
    }

    // --- proxy registry ---

    pub fn add_proxy(&self, proxy: Proxy) -> GovernorResult<()> {
        self.registry.add_proxy(proxy)
    }

    pub fn remove_proxy(&self, id: &str) -> GovernorResult<Proxy> {
        self.registry.remove_proxy(id)
    }

    pub fn get_proxies_for_region(&self, region: &str) -> Vec<Proxy> {
        self.registry.get_proxies_for_region(region)
    }

    pub fn get_region_distribution(&self) -> HashMap<String, usize> {
        self.registry.get_region_distribution()
    }

    pub fn build_pools(&self) -> Vec<ProxyPool> {
        self.registry.build_pools()
    }

    // --- selection ---

    pub fn select_pool<'a>(
        &self,
        pools: &'a [ProxyPool],
        requirements: &HashMap<String, String>,
    ) -> Option<&'a ProxyPool> {
        self.balancer.select_pool(pools, requirements)
    }

    // --- health ---

    pub async fn check_proxy_health(&self, proxy: &Proxy) -> GovernorResult<()> {
        self.health.check_proxy_health(proxy).await
    }

    pub fn get_health_results(&self) -> HashMap<String, HealthCheckResult> {
        self.health.get_health_results()
    }

    pub fn start_health_sweep(&self) -> tokio::task::JoinHandle<()> {
        self.health
            .clone()
            .start_background_sweep(self.config.health_check_interval())
    }

    pub fn start_health_sweep_every(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.health.clone().start_background_sweep(interval)
    }

    /// Dispatcher feedback after a routed call: outcome flows into the
    /// health counters and spend accrues for the attempt either way, since
    /// providers bill failed requests too.
    pub fn record_outcome(
        &self,
        proxy_id: &str,
        success: bool,
        latency_ms: Option<u64>,
        bytes: u64,
    ) {
        self.health.record_outcome(proxy_id, success, latency_ms);
        if let Some(proxy) = self.registry.get_proxy(proxy_id) {
            self.cost.track_usage(proxy_id, proxy.cost_per_request);
            if bytes > 0 {
                self.cost.track_transfer(proxy_id, bytes, proxy.cost_per_gb);
            }
        }
    }

    // --- cost ---

    pub fn track_usage(&self, id: &str, cost_per_request: f64) {
        self.cost.track_usage(id, cost_per_request)
    }

    pub fn get_total_cost(&self) -> f64 {
        self.cost.get_total_cost()
    }

    pub fn get_budget_remaining(&self) -> f64 {
        self.cost.get_budget_remaining()
    }

    pub fn is_budget_exceeded(&self) -> bool {
        self.cost.is_budget_exceeded()
    }

    pub fn get_cost_optimization_recommendations(&self) -> Vec<String> {
        self.cost.get_cost_optimization_recommendations()
    }

    // --- rotation ---

    pub fn set_strategy(&self, id: &str) -> GovernorResult<()> {
        self.rotation.set_strategy(id)
    }

    pub fn get_current_strategy(&self) -> LoadBalanceStrategy {
        self.rotation.current_strategy()
    }

    pub fn get_available_strategies(&self) -> Vec<&'static str> {
        self.rotation.available_strategies()
    }

    pub fn record_rotation_event(&self, resource_id: &str, strategy: &str, reason: &str) {
        self.rotation.record_rotation_event(resource_id, strategy, reason)
    }

    pub fn get_rotation_history(&self, resource_id: &str) -> Vec<RotationEvent> {
        self.rotation.get_rotation_history(resource_id)
    }

    // --- component handles ---

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &QuotaArbiter {
        &self.arbiter
    }

    pub fn registry(&self) -> &Arc<ProxyRegistry> {
        &self.registry
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn cost_optimizer(&self) -> &CostOptimizer {
        &self.cost
    }

    pub fn load_balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    pub fn rotation_engine(&self) -> &RotationEngine {
        &self.rotation
    }
}
