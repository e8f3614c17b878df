pub mod balancer;
pub mod cost;
pub mod health;
pub mod proxy;
pub mod registry;
pub mod rotation;

pub use balancer::{LoadBalanceStrategy, LoadBalancer};
pub use cost::{CostOptimizer, UsageRecord};
pub use health::{HealthCheckResult, HealthMonitor, HealthStatus};
pub use proxy::{AnonymityLevel, Proxy, ProxyAuth, ProxyPool, ProxyProtocol};
pub use registry::ProxyRegistry;
pub use rotation::{RotationEngine, RotationEvent};
