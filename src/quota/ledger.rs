use std::time::{Duration, Instant};

use crate::config::QuotaLimits;
use crate::constants::{DAY_WINDOW_SECS, HOUR_WINDOW_SECS, MINUTE_WINDOW_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Minute,
    Hour,
    Day,
}

impl WindowKind {
    pub fn length(self) -> Duration {
        match self {
            WindowKind::Minute => Duration::from_secs(MINUTE_WINDOW_SECS),
            WindowKind::Hour => Duration::from_secs(HOUR_WINDOW_SECS),
            WindowKind::Day => Duration::from_secs(DAY_WINDOW_SECS),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindowKind::Minute => "minute",
            WindowKind::Hour => "hour",
            WindowKind::Day => "day",
        }
    }
}

/// One quota accounting period. Resets lazily and independently of the
/// other windows on the same resource.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    pub kind: WindowKind,
    pub used: u64,
    pub limit: u64,
    pub window_start: Instant,
}

impl QuotaWindow {
    pub fn new(kind: WindowKind, limit: u64) -> Self {
        Self {
            kind,
            used: 0,
            limit,
            window_start: Instant::now(),
        }
    }

    pub fn reset_if_elapsed(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_start) >= self.kind.length() {
            self.used = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.used = 0;
        self.window_start = now;
    }

    pub fn has_headroom(&self) -> bool {
        self.used < self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.limit == 0 {
            1.0
        } else {
            self.used as f64 / self.limit as f64
        }
    }

    pub fn next_reset(&self, now: Instant) -> Duration {
        self.kind
            .length()
            .checked_sub(now.duration_since(self.window_start))
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct EngineQuotaInfo {
    pub name: String,
    pub minute: QuotaWindow,
    pub hour: QuotaWindow,
    pub day: QuotaWindow,
    pub concurrent: u64,
    pub concurrency_cap: u64,
    pub enabled: bool,
    pub priority: i32,
    pub fallback_engines: Vec<String>,
}

impl EngineQuotaInfo {
    pub fn new(name: impl Into<String>, limits: &QuotaLimits, concurrency_cap: u64) -> Self {
        Self {
            name: name.into(),
            minute: QuotaWindow::new(WindowKind::Minute, limits.per_minute),
            hour: QuotaWindow::new(WindowKind::Hour, limits.per_hour),
            day: QuotaWindow::new(WindowKind::Day, limits.per_day),
            concurrent: 0,
            concurrency_cap,
            enabled: true,
            priority: 0,
            fallback_engines: Vec::new(),
        }
    }

    pub fn windows(&self) -> [&QuotaWindow; 3] {
        [&self.minute, &self.hour, &self.day]
    }

    pub fn reset_elapsed_windows(&mut self, now: Instant) {
        self.minute.reset_if_elapsed(now);
        self.hour.reset_if_elapsed(now);
        self.day.reset_if_elapsed(now);
    }

    pub fn reset_all(&mut self, now: Instant) {
        self.minute.reset(now);
        self.hour.reset(now);
        self.day.reset(now);
        self.concurrent = 0;
    }

    /// Headroom on all three windows plus a spare concurrency slot.
    pub fn has_headroom(&self) -> bool {
        self.windows().iter().all(|w| w.has_headroom()) && self.concurrent < self.concurrency_cap
    }

    pub fn record_grant(&mut self) {
        self.minute.used += 1;
        self.hour.used += 1;
        self.day.used += 1;
        self.concurrent += 1;
    }

    pub fn release_slot(&mut self) {
        self.concurrent = self.concurrent.saturating_sub(1);
    }

    pub fn next_reset(&self, now: Instant) -> Duration {
        self.windows()
            .iter()
            .map(|w| w.next_reset(now))
            .min()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct GlobalQuotaInfo {
    pub minute: QuotaWindow,
    pub hour: QuotaWindow,
    pub day: QuotaWindow,
    pub concurrent: u64,
    pub concurrency_cap: u64,
}

impl GlobalQuotaInfo {
    pub fn new(limits: &QuotaLimits, concurrency_cap: u64) -> Self {
        Self {
            minute: QuotaWindow::new(WindowKind::Minute, limits.per_minute),
            hour: QuotaWindow::new(WindowKind::Hour, limits.per_hour),
            day: QuotaWindow::new(WindowKind::Day, limits.per_day),
            concurrent: 0,
            concurrency_cap,
        }
    }

    pub fn windows(&self) -> [&QuotaWindow; 3] {
        [&self.minute, &self.hour, &self.day]
    }

    pub fn reset_elapsed_windows(&mut self, now: Instant) {
        self.minute.reset_if_elapsed(now);
        self.hour.reset_if_elapsed(now);
        self.day.reset_if_elapsed(now);
    }

    pub fn reset_all(&mut self, now: Instant) {
        self.minute.reset(now);
        self.hour.reset(now);
        self.day.reset(now);
        self.concurrent = 0;
    }

    pub fn record_grant(&mut self) {
        self.minute.used += 1;
        self.hour.used += 1;
        self.day.used += 1;
        self.concurrent += 1;
    }

    pub fn release_slot(&mut self) {
        self.concurrent = self.concurrent.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn limits() -> QuotaLimits {
        QuotaLimits::new(2, 10, 100)
    }

    #[test]
    fn window_resets_only_after_full_length() {
        let mut window = QuotaWindow::new(WindowKind::Minute, 5);
        window.used = 5;
        let start = window.window_start;

        assert!(!window.reset_if_elapsed(start + Duration::from_secs(59)));
        assert_eq!(window.used, 5);

        assert!(window.reset_if_elapsed(start + Duration::from_secs(60)));
        assert_eq!(window.used, 0);
    }

    #[test]
    fn windows_reset_independently() {
        let mut engine = EngineQuotaInfo::new("bing", &limits(), 4);
        engine.minute.used = 2;
        engine.hour.used = 7;
        let hour_start = engine.hour.window_start;

        engine.minute.window_start = Instant::now() - Duration::from_secs(61);
        engine.reset_elapsed_windows(Instant::now());

        assert_eq!(engine.minute.used, 0);
        assert_eq!(engine.hour.used, 7);
        assert_eq!(engine.hour.window_start, hour_start);
    }

    #[test]
    fn headroom_requires_all_windows_and_a_slot() {
        let mut engine = EngineQuotaInfo::new("google", &limits(), 1);
        assert!(engine.has_headroom());

        engine.record_grant();
        // Concurrency slot is gone even though the hour/day windows are open.
        assert!(!engine.has_headroom());

        engine.release_slot();
        assert!(engine.has_headroom());

        engine.minute.used = engine.minute.limit;
        assert!(!engine.has_headroom());
    }

    #[test]
    fn release_floors_at_zero() {
        let mut engine = EngineQuotaInfo::new("ddg", &limits(), 4);
        engine.release_slot();
        assert_eq!(engine.concurrent, 0);

        let mut global = GlobalQuotaInfo::new(&limits(), 4);
        global.release_slot();
        assert_eq!(global.concurrent, 0);
    }

    #[test]
    fn zero_limit_window_never_has_headroom() {
        let window = QuotaWindow::new(WindowKind::Day, 0);
        assert!(!window.has_headroom());
        assert_eq!(window.usage_ratio(), 1.0);
    }
}
