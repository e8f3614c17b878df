use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{GovernorError, GovernorResult};
use crate::pool::proxy::ProxyPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    RoundRobin,
    LeastConnections,
    Geographic,
    CostBased,
}

impl LoadBalanceStrategy {
    pub const ALL: [LoadBalanceStrategy; 4] = [
        LoadBalanceStrategy::RoundRobin,
        LoadBalanceStrategy::LeastConnections,
        LoadBalanceStrategy::Geographic,
        LoadBalanceStrategy::CostBased,
    ];

    pub fn id(self) -> &'static str {
        match self {
            LoadBalanceStrategy::RoundRobin => "round_robin",
            LoadBalanceStrategy::LeastConnections => "least_connections",
            LoadBalanceStrategy::Geographic => "geographic",
            LoadBalanceStrategy::CostBased => "cost_based",
        }
    }

    pub fn parse(id: &str) -> GovernorResult<Self> {
        match id.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" => Ok(LoadBalanceStrategy::RoundRobin),
            "least_connections" => Ok(LoadBalanceStrategy::LeastConnections),
            "geographic" => Ok(LoadBalanceStrategy::Geographic),
            "cost_based" => Ok(LoadBalanceStrategy::CostBased),
            _ => Err(GovernorError::UnknownStrategy(id.to_string())),
        }
    }
}

/// Picks one pool from the candidates. Strategy is fixed per instance, not
/// per call.
pub struct LoadBalancer {
    strategy: LoadBalanceStrategy,
    round_robin_index: AtomicUsize,
}

impl LoadBalancer {
    pub fn new(strategy: LoadBalanceStrategy) -> Self {
        Self {
            strategy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> LoadBalanceStrategy {
        self.strategy
    }

    /// `None` means "no resource available", not an error to retry.
    pub fn select_pool<'a>(
        &self,
        pools: &'a [ProxyPool],
        requirements: &HashMap<String, String>,
    ) -> Option<&'a ProxyPool> {
        if pools.is_empty() {
            return None;
        }

        match self.strategy {
            LoadBalanceStrategy::RoundRobin => {
                let index = self.round_robin_index.fetch_add(1, Ordering::Relaxed);
                Some(&pools[index % pools.len()])
            }
            // Ties break on iteration order: first seen wins.
            LoadBalanceStrategy::LeastConnections => {
                pools.iter().min_by_key(|pool| pool.total_load())
            }
            LoadBalanceStrategy::Geographic => requirements
                .get("region")
                .and_then(|region| pools.iter().find(|pool| &pool.region == region))
                .or_else(|| pools.first()),
            LoadBalanceStrategy::CostBased => pools.iter().min_by(|a, b| {
                a.cost_per_request
                    .partial_cmp(&b.cost_per_request)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pool_with_loads;

    #[test]
    fn strategy_ids_round_trip() {
        for strategy in LoadBalanceStrategy::ALL {
            assert_eq!(LoadBalanceStrategy::parse(strategy.id()).unwrap(), strategy);
        }
        assert_eq!(
            LoadBalanceStrategy::parse("round-robin").unwrap(),
            LoadBalanceStrategy::RoundRobin
        );
        assert!(matches!(
            LoadBalanceStrategy::parse("chaos").unwrap_err(),
            GovernorError::UnknownStrategy(_)
        ));
    }

    #[test]
    fn empty_pool_list_yields_none() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::RoundRobin);
        assert!(balancer.select_pool(&[], &HashMap::new()).is_none());
    }

    #[test]
    fn round_robin_cycles_through_pools() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::RoundRobin);
        let pools = vec![
            pool_with_loads("a", "us-east", &[0]),
            pool_with_loads("b", "eu-west", &[0]),
            pool_with_loads("c", "ap-south", &[0]),
        ];
        let picks: Vec<&str> = (0..6)
            .map(|_| {
                balancer
                    .select_pool(&pools, &HashMap::new())
                    .unwrap()
                    .name
                    .as_str()
            })
            .collect();
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn least_connections_picks_minimum_summed_load() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::LeastConnections);
        let pools = vec![
            pool_with_loads("busy", "us-east", &[2, 3]),
            pool_with_loads("idle", "eu-west", &[1, 1]),
            pool_with_loads("slammed", "ap-south", &[4, 4]),
        ];
        let pick = balancer.select_pool(&pools, &HashMap::new()).unwrap();
        assert_eq!(pick.name, "idle");
    }

    #[test]
    fn least_connections_tie_goes_to_first_seen() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::LeastConnections);
        let pools = vec![
            pool_with_loads("first", "us-east", &[1, 1]),
            pool_with_loads("second", "eu-west", &[2]),
        ];
        let pick = balancer.select_pool(&pools, &HashMap::new()).unwrap();
        assert_eq!(pick.name, "first");
    }

    #[test]
    fn geographic_matches_required_region() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::Geographic);
        let pools = vec![
            pool_with_loads("a", "us-east", &[0]),
            pool_with_loads("b", "eu-west", &[0]),
        ];
        let mut requirements = HashMap::new();
        requirements.insert("region".to_string(), "eu-west".to_string());
        let pick = balancer.select_pool(&pools, &requirements).unwrap();
        assert_eq!(pick.name, "b");
    }

    #[test]
    fn geographic_falls_back_to_first_pool() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::Geographic);
        let pools = vec![
            pool_with_loads("a", "us-east", &[0]),
            pool_with_loads("b", "eu-west", &[0]),
        ];
        // No region requirement.
        let pick = balancer.select_pool(&pools, &HashMap::new()).unwrap();
        assert_eq!(pick.name, "a");

        // Region requirement with no matching pool.
        let mut requirements = HashMap::new();
        requirements.insert("region".to_string(), "ap-south".to_string());
        let pick = balancer.select_pool(&pools, &requirements).unwrap();
        assert_eq!(pick.name, "a");
    }

    #[test]
    fn cost_based_picks_cheapest_pool() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::CostBased);
        let mut a = pool_with_loads("a", "us-east", &[0]);
        a.cost_per_request = 0.01;
        let mut b = pool_with_loads("b", "eu-west", &[0]);
        b.cost_per_request = 0.005;
        let mut c = pool_with_loads("c", "ap-south", &[0]);
        c.cost_per_request = 0.02;

        let pools = vec![a, b, c];
        let pick = balancer.select_pool(&pools, &HashMap::new()).unwrap();
        assert_eq!(pick.name, "b");
    }

    #[test]
    fn cost_based_tie_goes_to_first_seen() {
        let balancer = LoadBalancer::new(LoadBalanceStrategy::CostBased);
        let mut a = pool_with_loads("a", "us-east", &[0]);
        a.cost_per_request = 0.005;
        let mut b = pool_with_loads("b", "eu-west", &[0]);
        b.cost_per_request = 0.005;

        let pools = vec![a, b];
        let pick = balancer.select_pool(&pools, &HashMap::new()).unwrap();
        assert_eq!(pick.name, "a");
    }
}
