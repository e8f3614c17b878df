use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::constants::ROTATION_HISTORY_CAP;
use crate::error::GovernorResult;
use crate::pool::balancer::LoadBalanceStrategy;

/// Append-only audit record: why a resource was rotated to, and when.
#[derive(Debug, Clone, Serialize)]
pub struct RotationEvent {
    pub id: String,
    pub resource_id: String,
    pub strategy: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Strategy registry and rotation audit trail. Does not pick proxies
/// itself; callers consult it before and after a selection so "why was
/// this proxy used" stays reconstructable.
pub struct RotationEngine {
    current: RwLock<LoadBalanceStrategy>,
    history: RwLock<HashMap<String, VecDeque<RotationEvent>>>,
    history_cap: usize,
}

impl RotationEngine {
    pub fn new(initial: LoadBalanceStrategy) -> Self {
        Self {
            current: RwLock::new(initial),
            history: RwLock::new(HashMap::new()),
            history_cap: ROTATION_HISTORY_CAP,
        }
    }

    pub fn current_strategy(&self) -> LoadBalanceStrategy {
        *self.current.read()
    }

    pub fn set_strategy(&self, id: &str) -> GovernorResult<()> {
        let strategy = LoadBalanceStrategy::parse(id)?;
        *self.current.write() = strategy;
        tracing::info!("[Rotation] Strategy set to {}", strategy.id());
        Ok(())
    }

    pub fn available_strategies(&self) -> Vec<&'static str> {
        LoadBalanceStrategy::ALL.iter().map(|s| s.id()).collect()
    }

    pub fn record_rotation_event(&self, resource_id: &str, strategy: &str, reason: &str) {
        let event = RotationEvent {
            id: Uuid::new_v4().to_string(),
            resource_id: resource_id.to_string(),
            strategy: strategy.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };

        let mut history = self.history.write();
        let events = history.entry(resource_id.to_string()).or_default();
        if events.len() >= self.history_cap {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn get_rotation_history(&self, resource_id: &str) -> Vec<RotationEvent> {
        self.history
            .read()
            .get(resource_id)
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }
}
