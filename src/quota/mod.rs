pub mod arbiter;
pub mod fallback;
pub mod ledger;

pub use arbiter::{
    EngineSettings, EngineStatus, GlobalStatus, QuotaArbiter, QuotaRequest, QuotaResponse,
    QuotaStatus, RemainingQuota, WindowStatus,
};
pub use ledger::{EngineQuotaInfo, GlobalQuotaInfo, QuotaWindow, WindowKind};
