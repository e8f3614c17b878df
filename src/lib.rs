pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod governor;
pub mod logging;
pub mod pool;
pub mod quota;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{GovernorConfig, QuotaLimits};
pub use engine::{SearchEngine, SearchResponse, SearchResult};
pub use error::{GovernorError, GovernorResult};
pub use governor::Governor;
pub use pool::{
    AnonymityLevel, CostOptimizer, HealthCheckResult, HealthMonitor, HealthStatus,
    LoadBalanceStrategy, LoadBalancer, Proxy, ProxyAuth, ProxyPool, ProxyProtocol, ProxyRegistry,
    RotationEngine, RotationEvent,
};
pub use quota::{
    EngineSettings, EngineStatus, QuotaArbiter, QuotaRequest, QuotaResponse, QuotaStatus,
};
