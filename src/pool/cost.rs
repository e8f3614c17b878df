use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;

/// Accumulated spend for one resource. `unit_cost` is the most recently
/// reported per-request cost; `transfer_cost` accrues per-GB charges.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageRecord {
    pub requests: u64,
    pub unit_cost: f64,
    pub transfer_cost: f64,
}

impl UsageRecord {
    pub fn total_cost(&self) -> f64 {
        self.requests as f64 * self.unit_cost + self.transfer_cost
    }
}

/// Advisory spend tracker. Never blocks a request; blocking is the
/// arbiter's job.
pub struct CostOptimizer {
    usage: DashMap<String, UsageRecord>,
    budget_limit: f64,
}

impl CostOptimizer {
    pub fn new(budget_limit: f64) -> Self {
        Self {
            usage: DashMap::new(),
            budget_limit,
        }
    }

    pub fn track_usage(&self, id: &str, cost_per_request: f64) {
        let mut record = self.usage.entry(id.to_string()).or_default();
        record.requests += 1;
        record.unit_cost = cost_per_request;
    }

    pub fn track_transfer(&self, id: &str, bytes: u64, cost_per_gb: f64) {
        let mut record = self.usage.entry(id.to_string()).or_default();
        record.transfer_cost += bytes as f64 / 1e9 * cost_per_gb;
    }

    pub fn get_total_cost(&self) -> f64 {
        self.usage.iter().map(|kv| kv.value().total_cost()).sum()
    }

    /// May go negative once the budget is blown.
    pub fn get_budget_remaining(&self) -> f64 {
        self.budget_limit - self.get_total_cost()
    }

    pub fn is_budget_exceeded(&self) -> bool {
        self.get_total_cost() > self.budget_limit
    }

    /// Resources ranked by unit cost descending; a retire suggestion for the
    /// most expensive one and a warning when over budget.
    pub fn get_cost_optimization_recommendations(&self) -> Vec<String> {
        let mut ranked: Vec<(String, UsageRecord)> = self
            .usage
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.unit_cost
                .partial_cmp(&a.1.unit_cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut recommendations = Vec::new();
        if let Some((id, record)) = ranked.first() {
            recommendations.push(format!(
                "Consider retiring or renegotiating {}: highest unit cost at ${:.4}/request over {} requests (${:.2} total)",
                id,
                record.unit_cost,
                record.requests,
                record.total_cost()
            ));
        }
        if self.is_budget_exceeded() {
            let total = self.get_total_cost();
            tracing::warn!(
                "[Cost] Budget exceeded: ${:.2} spent of ${:.2}",
                total,
                self.budget_limit
            );
            recommendations.push(format!(
                "Budget exceeded: ${:.2} spent of ${:.2} allowed",
                total, self.budget_limit
            ));
        }
        recommendations
    }

    pub fn usage_snapshot(&self) -> HashMap<String, UsageRecord> {
        self.usage
            .iter()
            .map(|kv| (kv.key().clone(), kv.value().clone()))
            .collect()
    }
}
