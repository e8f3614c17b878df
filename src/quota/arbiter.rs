use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::config::{GovernorConfig, QuotaLimits};
use crate::error::{GovernorError, GovernorResult};
use crate::quota::ledger::{EngineQuotaInfo, GlobalQuotaInfo, QuotaWindow};

fn default_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRequest {
    pub engine: String,
    #[serde(default = "default_request_id")]
    pub request_id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl QuotaRequest {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            request_id: default_request_id(),
            priority: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RemainingQuota {
    pub minute: u64,
    pub hour: u64,
    pub day: u64,
}

impl RemainingQuota {
    fn from_windows(windows: [&QuotaWindow; 3]) -> Self {
        Self {
            minute: windows[0].remaining(),
            hour: windows[1].remaining(),
            day: windows[2].remaining(),
        }
    }
}

/// Immutable snapshot of one admission decision.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaResponse {
    pub allowed: bool,
    pub engine: String,
    pub request_id: String,
    pub remaining: RemainingQuota,
    /// Suggested wait before retrying; only meaningful when `allowed` is false.
    pub wait_time_secs: u64,
    pub next_reset_secs: u64,
    pub reason: String,
}

impl QuotaResponse {
    fn granted(req: &QuotaRequest, engine: &EngineQuotaInfo, now: Instant) -> Self {
        Self {
            allowed: true,
            engine: engine.name.clone(),
            request_id: req.request_id.clone(),
            remaining: RemainingQuota::from_windows(engine.windows()),
            wait_time_secs: 0,
            next_reset_secs: engine.next_reset(now).as_secs(),
            reason: "granted".to_string(),
        }
    }

    fn denied(
        req: &QuotaRequest,
        engine: &EngineQuotaInfo,
        wait_time_secs: u64,
        reason: String,
        now: Instant,
    ) -> Self {
        Self {
            allowed: false,
            engine: engine.name.clone(),
            request_id: req.request_id.clone(),
            remaining: RemainingQuota::from_windows(engine.windows()),
            wait_time_secs,
            next_reset_secs: engine.next_reset(now).as_secs(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub name: String,
    #[serde(default)]
    pub limits: Option<QuotaLimits>,
    #[serde(default)]
    pub concurrency_cap: Option<u64>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub fallback_engines: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl EngineSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            limits: None,
            concurrency_cap: None,
            priority: 0,
            fallback_engines: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_limits(mut self, limits: QuotaLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_concurrency_cap(mut self, cap: u64) -> Self {
        self.concurrency_cap = Some(cap);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<String>) -> Self {
        self.fallback_engines = fallbacks;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percent_used: f64,
}

impl WindowStatus {
    fn from_window(window: &QuotaWindow) -> Self {
        Self {
            used: window.used,
            limit: window.limit,
            remaining: window.remaining(),
            percent_used: window.usage_ratio() * 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub name: String,
    pub enabled: bool,
    pub priority: i32,
    pub minute: WindowStatus,
    pub hour: WindowStatus,
    pub day: WindowStatus,
    pub concurrent: u64,
    pub concurrency_cap: u64,
    pub fallback_engines: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalStatus {
    pub minute: WindowStatus,
    pub hour: WindowStatus,
    pub day: WindowStatus,
    pub concurrent: u64,
    pub concurrency_cap: u64,
}

/// Read-only diagnostic snapshot; never consulted for admission decisions.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub global: GlobalStatus,
    pub engines: Vec<EngineStatus>,
    pub alert_threshold: f64,
    pub retry_delay_secs: u64,
}

impl QuotaStatus {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub(crate) struct LedgerState {
    pub(crate) engines: HashMap<String, EngineQuotaInfo>,
    /// Engine names in registration order.
    pub(crate) order: Vec<String>,
    pub(crate) global: GlobalQuotaInfo,
}

pub struct QuotaArbiter {
    pub(crate) state: RwLock<LedgerState>,
    pub(crate) config: GovernorConfig,
}

impl QuotaArbiter {
    pub fn new(config: GovernorConfig) -> Self {
        let global = GlobalQuotaInfo::new(&config.global_limits, config.global_concurrency_cap);
        Self {
            state: RwLock::new(LedgerState {
                engines: HashMap::new(),
                order: Vec::new(),
                global,
            }),
            config,
        }
    }

    pub fn add_engine(&self, settings: EngineSettings) -> GovernorResult<()> {
        let mut state = self.state.write();
        if state.engines.contains_key(&settings.name) {
            return Err(GovernorError::DuplicateEngine(settings.name));
        }
        let limits = settings.limits.unwrap_or(self.config.default_engine_limits);
        let cap = settings
            .concurrency_cap
            .unwrap_or(self.config.default_engine_concurrency_cap);
        let mut engine = EngineQuotaInfo::new(settings.name.clone(), &limits, cap);
        engine.priority = settings.priority;
        engine.fallback_engines = settings.fallback_engines;
        engine.enabled = settings.enabled;

        state.order.push(settings.name.clone());
        state.engines.insert(settings.name.clone(), engine);
        tracing::info!("[Quota] Registered engine {}", settings.name);
        Ok(())
    }

    /// Replaces limits, caps, priority, fallbacks and the enabled flag while
    /// keeping the accumulated usage counters.
    pub fn update_engine(&self, settings: EngineSettings) -> GovernorResult<()> {
        let mut state = self.state.write();
        let engine = state
            .engines
            .get_mut(&settings.name)
            .ok_or_else(|| GovernorError::UnknownEngine(settings.name.clone()))?;

        if let Some(limits) = settings.limits {
            engine.minute.limit = limits.per_minute;
            engine.hour.limit = limits.per_hour;
            engine.day.limit = limits.per_day;
        }
        if let Some(cap) = settings.concurrency_cap {
            engine.concurrency_cap = cap;
        }
        engine.priority = settings.priority;
        engine.fallback_engines = settings.fallback_engines;
        engine.enabled = settings.enabled;
        tracing::info!("[Quota] Updated engine {}", settings.name);
        Ok(())
    }

    pub fn remove_engine(&self, name: &str) -> GovernorResult<()> {
        let mut state = self.state.write();
        if state.engines.remove(name).is_none() {
            return Err(GovernorError::UnknownEngine(name.to_string()));
        }
        state.order.retain(|n| n != name);
        tracing::info!("[Quota] Removed engine {}", name);
        Ok(())
    }

    pub fn enable_engine(&self, name: &str) -> GovernorResult<()> {
        self.set_enabled(name, true)
    }

    pub fn disable_engine(&self, name: &str) -> GovernorResult<()> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> GovernorResult<()> {
        let mut state = self.state.write();
        let engine = state
            .engines
            .get_mut(name)
            .ok_or_else(|| GovernorError::UnknownEngine(name.to_string()))?;
        engine.enabled = enabled;
        tracing::info!(
            "[Quota] Engine {} {}",
            name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Admission gate. Checks run in a fixed order and the first failure wins;
    /// check-then-increment happens under one write lock so two callers can
    /// never both pass a check that only one should have.
    pub fn request_quota(&self, req: &QuotaRequest) -> GovernorResult<QuotaResponse> {
        let now = Instant::now();
        let wait = self.config.retry_delay_secs;

        let mut state = self.state.write();
        let LedgerState {
            engines, global, ..
        } = &mut *state;
        let engine = engines
            .get_mut(&req.engine)
            .ok_or_else(|| GovernorError::UnknownEngine(req.engine.clone()))?;

        if !engine.enabled {
            let reason = format!("engine {} is disabled", engine.name);
            tracing::debug!("[Quota] Denied {}: {}", req.request_id, reason);
            return Ok(QuotaResponse::denied(req, engine, wait, reason, now));
        }

        global.reset_elapsed_windows(now);
        engine.reset_elapsed_windows(now);

        if let Some(kind) = global
            .windows()
            .iter()
            .find(|w| !w.has_headroom())
            .map(|w| w.kind)
        {
            let reason = format!("global {} quota exceeded", kind.label());
            tracing::debug!("[Quota] Denied {}: {}", req.request_id, reason);
            return Ok(QuotaResponse::denied(req, engine, wait, reason, now));
        }

        if let Some(kind) = engine
            .windows()
            .iter()
            .find(|w| !w.has_headroom())
            .map(|w| w.kind)
        {
            let reason = format!("engine {} {} quota exceeded", engine.name, kind.label());
            tracing::debug!("[Quota] Denied {}: {}", req.request_id, reason);
            return Ok(QuotaResponse::denied(req, engine, wait, reason, now));
        }

        if engine.concurrent >= engine.concurrency_cap {
            let reason = format!("engine {} concurrency cap reached", engine.name);
            tracing::debug!("[Quota] Denied {}: {}", req.request_id, reason);
            return Ok(QuotaResponse::denied(req, engine, wait, reason, now));
        }
        if global.concurrent >= global.concurrency_cap {
            let reason = "global concurrency cap reached".to_string();
            tracing::debug!("[Quota] Denied {}: {}", req.request_id, reason);
            return Ok(QuotaResponse::denied(req, engine, wait, reason, now));
        }

        engine.record_grant();
        global.record_grant();

        let threshold = self.config.alert_threshold;
        for window in engine.windows() {
            if window.usage_ratio() >= threshold {
                tracing::warn!(
                    "[Quota] Engine {} {} window at {}/{} ({:.0}% of limit)",
                    engine.name,
                    window.kind.label(),
                    window.used,
                    window.limit,
                    window.usage_ratio() * 100.0
                );
            }
        }
        for window in global.windows() {
            if window.usage_ratio() >= threshold {
                tracing::warn!(
                    "[Quota] Global {} window at {}/{} ({:.0}% of limit)",
                    window.kind.label(),
                    window.used,
                    window.limit,
                    window.usage_ratio() * 100.0
                );
            }
        }

        Ok(QuotaResponse::granted(req, engine, now))
    }

    /// Frees the in-flight slot taken by a prior grant. Usage counters are a
    /// ledger of consumption and are never decremented here.
    pub fn release_quota(&self, engine_name: &str, request_id: &str) -> GovernorResult<()> {
        let mut state = self.state.write();
        let LedgerState {
            engines, global, ..
        } = &mut *state;
        let engine = engines
            .get_mut(engine_name)
            .ok_or_else(|| GovernorError::UnknownEngine(engine_name.to_string()))?;
        engine.release_slot();
        global.release_slot();
        tracing::debug!("[Quota] Released slot for {} ({})", engine_name, request_id);
        Ok(())
    }

    /// Administrative: zeroes every counter and restamps every window now.
    pub fn reset_quotas(&self) {
        let now = Instant::now();
        let mut state = self.state.write();
        state.global.reset_all(now);
        for engine in state.engines.values_mut() {
            engine.reset_all(now);
        }
        tracing::warn!("[Quota] All quota counters reset");
    }

    pub fn get_quota_status(&self) -> QuotaStatus {
        let state = self.state.read();
        let engines = state
            .order
            .iter()
            .filter_map(|name| state.engines.get(name))
            .map(|engine| EngineStatus {
                name: engine.name.clone(),
                enabled: engine.enabled,
                priority: engine.priority,
                minute: WindowStatus::from_window(&engine.minute),
                hour: WindowStatus::from_window(&engine.hour),
                day: WindowStatus::from_window(&engine.day),
                concurrent: engine.concurrent,
                concurrency_cap: engine.concurrency_cap,
                fallback_engines: engine.fallback_engines.clone(),
            })
            .collect();

        QuotaStatus {
            global: GlobalStatus {
                minute: WindowStatus::from_window(&state.global.minute),
                hour: WindowStatus::from_window(&state.global.hour),
                day: WindowStatus::from_window(&state.global.day),
                concurrent: state.global.concurrent,
                concurrency_cap: state.global.concurrency_cap,
            },
            engines,
            alert_threshold: self.config.alert_threshold,
            retry_delay_secs: self.config.retry_delay_secs,
        }
    }
}
