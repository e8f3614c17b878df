use std::time::Instant;

use crate::quota::arbiter::QuotaArbiter;

impl QuotaArbiter {
    /// Walks the engine's ordered fallback list and returns the first entry
    /// that is enabled and has headroom on all three windows plus a spare
    /// concurrency slot. `None` when nothing qualifies or the engine is
    /// unknown.
    pub fn get_fallback_engine(&self, name: &str) -> Option<String> {
        let now = Instant::now();
        let mut state = self.state.write();
        let chain = state.engines.get(name)?.fallback_engines.clone();

        for candidate in chain {
            if let Some(engine) = state.engines.get_mut(&candidate) {
                if !engine.enabled {
                    continue;
                }
                engine.reset_elapsed_windows(now);
                if engine.has_headroom() {
                    tracing::debug!("[Quota] Fallback for {} -> {}", name, candidate);
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Enabled engines with current headroom, in registration order.
    pub fn get_available_engines(&self) -> Vec<String> {
        let now = Instant::now();
        let mut state = self.state.write();
        let order = state.order.clone();

        order
            .into_iter()
            .filter(|name| {
                state
                    .engines
                    .get_mut(name)
                    .map(|engine| {
                        if !engine.enabled {
                            return false;
                        }
                        engine.reset_elapsed_windows(now);
                        engine.has_headroom()
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{GovernorConfig, QuotaLimits};
    use crate::quota::arbiter::{EngineSettings, QuotaArbiter, QuotaRequest};

    fn arbiter() -> QuotaArbiter {
        let config = GovernorConfig {
            default_engine_limits: QuotaLimits::new(2, 100, 1000),
            ..GovernorConfig::default()
        };
        QuotaArbiter::new(config)
    }

    #[test]
    fn fallback_walks_chain_in_order() {
        let arbiter = arbiter();
        arbiter
            .add_engine(
                EngineSettings::new("a")
                    .with_fallbacks(vec!["b".to_string(), "c".to_string()]),
            )
            .unwrap();
        arbiter.add_engine(EngineSettings::new("b")).unwrap();
        arbiter.add_engine(EngineSettings::new("c")).unwrap();
        arbiter.disable_engine("a").unwrap();

        assert_eq!(arbiter.get_fallback_engine("a"), Some("b".to_string()));

        // Exhaust b's minute window; c becomes the answer.
        arbiter.request_quota(&QuotaRequest::new("b")).unwrap();
        arbiter.request_quota(&QuotaRequest::new("b")).unwrap();
        assert_eq!(arbiter.get_fallback_engine("a"), Some("c".to_string()));

        // Exhaust c as well; nothing qualifies.
        arbiter.request_quota(&QuotaRequest::new("c")).unwrap();
        arbiter.request_quota(&QuotaRequest::new("c")).unwrap();
        assert_eq!(arbiter.get_fallback_engine("a"), None);
    }

    #[test]
    fn fallback_skips_disabled_entries() {
        let arbiter = arbiter();
        arbiter
            .add_engine(
                EngineSettings::new("a")
                    .with_fallbacks(vec!["b".to_string(), "c".to_string()]),
            )
            .unwrap();
        arbiter.add_engine(EngineSettings::new("b")).unwrap();
        arbiter.add_engine(EngineSettings::new("c")).unwrap();
        arbiter.disable_engine("b").unwrap();

        assert_eq!(arbiter.get_fallback_engine("a"), Some("c".to_string()));
    }

    #[test]
    fn fallback_for_unknown_engine_is_none() {
        let arbiter = arbiter();
        assert_eq!(arbiter.get_fallback_engine("missing"), None);
    }

    #[test]
    fn fallback_entries_not_registered_are_skipped() {
        let arbiter = arbiter();
        arbiter
            .add_engine(
                EngineSettings::new("a")
                    .with_fallbacks(vec!["ghost".to_string(), "b".to_string()]),
            )
            .unwrap();
        arbiter.add_engine(EngineSettings::new("b")).unwrap();
        arbiter.disable_engine("a").unwrap();

        assert_eq!(arbiter.get_fallback_engine("a"), Some("b".to_string()));
    }

    // Pins the insertion-order contract: available engines are not sorted by
    // priority even though engines carry one.
    #[test]
    fn available_engines_keep_registration_order() {
        let arbiter = arbiter();
        arbiter
            .add_engine(EngineSettings::new("zeta").with_priority(5))
            .unwrap();
        arbiter
            .add_engine(EngineSettings::new("alpha").with_priority(1))
            .unwrap();
        arbiter
            .add_engine(EngineSettings::new("mid").with_priority(3))
            .unwrap();

        assert_eq!(
            arbiter.get_available_engines(),
            vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()]
        );
    }

    #[test]
    fn available_engines_drop_disabled_and_exhausted() {
        let arbiter = arbiter();
        arbiter.add_engine(EngineSettings::new("a")).unwrap();
        arbiter.add_engine(EngineSettings::new("b")).unwrap();
        arbiter.add_engine(EngineSettings::new("c")).unwrap();

        arbiter.disable_engine("b").unwrap();
        arbiter.request_quota(&QuotaRequest::new("c")).unwrap();
        arbiter.request_quota(&QuotaRequest::new("c")).unwrap();

        assert_eq!(arbiter.get_available_engines(), vec!["a".to_string()]);
    }
}
