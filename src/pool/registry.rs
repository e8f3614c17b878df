use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{GovernorError, GovernorResult};
use crate::pool::proxy::{Proxy, ProxyPool};

struct RegistryState {
    proxies: HashMap<String, Proxy>,
    /// Derived multimap (region -> proxy ids); kept consistent with the
    /// proxy map inside the same critical section.
    region_index: HashMap<String, Vec<String>>,
}

/// Catalog of registered egress proxies plus the geographic index.
pub struct ProxyRegistry {
    state: RwLock<RegistryState>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                proxies: HashMap::new(),
                region_index: HashMap::new(),
            }),
        }
    }

    pub fn add_proxy(&self, proxy: Proxy) -> GovernorResult<()> {
        let mut state = self.state.write();
        if state.proxies.contains_key(&proxy.id) {
            return Err(GovernorError::DuplicateProxy(proxy.id));
        }
        if !proxy.region.is_empty() {
            state
                .region_index
                .entry(proxy.region.clone())
                .or_default()
                .push(proxy.id.clone());
        }
        tracing::info!(
            "[Registry] Added proxy {} ({}, {})",
            proxy.id,
            proxy.url(),
            proxy.region
        );
        state.proxies.insert(proxy.id.clone(), proxy);
        Ok(())
    }

    pub fn remove_proxy(&self, id: &str) -> GovernorResult<Proxy> {
        let mut state = self.state.write();
        let proxy = state
            .proxies
            .remove(id)
            .ok_or_else(|| GovernorError::UnknownProxy(id.to_string()))?;
        if let Some(ids) = state.region_index.get_mut(&proxy.region) {
            ids.retain(|pid| pid != id);
            if ids.is_empty() {
                state.region_index.remove(&proxy.region);
            }
        }
        tracing::info!("[Registry] Removed proxy {}", id);
        Ok(proxy)
    }

    pub fn get_proxy(&self, id: &str) -> Option<Proxy> {
        self.state.read().proxies.get(id).cloned()
    }

    pub fn get_proxies_for_region(&self, region: &str) -> Vec<Proxy> {
        let state = self.state.read();
        state
            .region_index
            .get(region)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.proxies.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_region_distribution(&self) -> HashMap<String, usize> {
        self.state
            .read()
            .region_index
            .iter()
            .map(|(region, ids)| (region.clone(), ids.len()))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Proxy> {
        self.state.read().proxies.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().proxies.is_empty()
    }

    /// Groups registered proxies by region into pools with an averaged
    /// per-request cost, sorted by region name for stable iteration.
    pub fn build_pools(&self) -> Vec<ProxyPool> {
        let state = self.state.read();
        let mut regions: Vec<&String> = state.region_index.keys().collect();
        regions.sort();

        regions
            .into_iter()
            .filter_map(|region| {
                let ids = state.region_index.get(region)?;
                let proxies: Vec<Proxy> = ids
                    .iter()
                    .filter_map(|id| state.proxies.get(id).cloned())
                    .collect();
                if proxies.is_empty() {
                    return None;
                }
                let cost = proxies.iter().map(|p| p.cost_per_request).sum::<f64>()
                    / proxies.len() as f64;
                Some(ProxyPool {
                    name: format!("pool-{}", region),
                    region: region.clone(),
                    proxies,
                    cost_per_request: cost,
                })
            })
            .collect()
    }

    /// Runs `f` against one proxy under the write lock. Health and cost
    /// commits go through here so no other path mutates those fields.
    pub(crate) fn with_proxy_mut<T>(&self, id: &str, f: impl FnOnce(&mut Proxy) -> T) -> Option<T> {
        let mut state = self.state.write();
        state.proxies.get_mut(id).map(f)
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_proxy;

    #[test]
    fn duplicate_proxy_is_an_error() {
        let registry = ProxyRegistry::new();
        registry.add_proxy(sample_proxy("p1", "us-east")).unwrap();
        let err = registry
            .add_proxy(sample_proxy("p1", "eu-west"))
            .unwrap_err();
        assert!(matches!(err, GovernorError::DuplicateProxy(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn region_index_tracks_add_and_remove() {
        let registry = ProxyRegistry::new();
        registry.add_proxy(sample_proxy("p1", "us-east")).unwrap();
        registry.add_proxy(sample_proxy("p2", "us-east")).unwrap();
        registry.add_proxy(sample_proxy("p3", "eu-west")).unwrap();

        let distribution = registry.get_region_distribution();
        assert_eq!(distribution.get("us-east"), Some(&2));
        assert_eq!(distribution.get("eu-west"), Some(&1));

        registry.remove_proxy("p2").unwrap();
        let distribution = registry.get_region_distribution();
        assert_eq!(distribution.get("us-east"), Some(&1));

        registry.remove_proxy("p3").unwrap();
        assert!(registry.get_region_distribution().get("eu-west").is_none());
        assert!(registry.get_proxies_for_region("eu-west").is_empty());
    }

    #[test]
    fn remove_unknown_proxy_errors() {
        let registry = ProxyRegistry::new();
        assert!(matches!(
            registry.remove_proxy("ghost").unwrap_err(),
            GovernorError::UnknownProxy(_)
        ));
    }

    #[test]
    fn build_pools_groups_by_region_with_average_cost() {
        let registry = ProxyRegistry::new();
        let mut cheap = sample_proxy("p1", "us-east");
        cheap.cost_per_request = 0.001;
        let mut pricey = sample_proxy("p2", "us-east");
        pricey.cost_per_request = 0.003;
        registry.add_proxy(cheap).unwrap();
        registry.add_proxy(pricey).unwrap();
        registry.add_proxy(sample_proxy("p3", "eu-west")).unwrap();

        let pools = registry.build_pools();
        assert_eq!(pools.len(), 2);
        // Sorted by region name: eu-west first.
        assert_eq!(pools[0].region, "eu-west");
        assert_eq!(pools[1].region, "us-east");
        assert_eq!(pools[1].proxies.len(), 2);
        assert!((pools[1].cost_per_request - 0.002).abs() < 1e-9);
    }
}
