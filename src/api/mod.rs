// ==========================================
// 集装箱配载引擎 - API 层
// ==========================================
// 职责: 事务化的业务入口,组合 Repository 与 Engine
// 红线: 写操作一律经 run_immediate; 只读分析不加写锁
// ==========================================

pub mod error;
pub mod ledger_api;
pub mod lifecycle_api;
pub mod loading_api;
mod transaction;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use ledger_api::LedgerApi;
pub use lifecycle_api::{CancelSummary, ConfirmSummary, LifecycleApi};
pub use loading_api::LoadingApi;
