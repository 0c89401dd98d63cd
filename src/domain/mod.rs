// ==========================================
// 集装箱配载引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、容量约束接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod allocation;
pub mod container;
pub mod packing;
pub mod rules;
pub mod shipment;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use allocation::{AllocationRecord, SourceLine};
pub use container::{Container, ContainerType};
pub use packing::{PackableUnit, PackingBoxType, ProductDimensions};
pub use rules::{ConcurrencyConflict, RuleViolation};
pub use shipment::{OperationContext, Shipment, ShipmentLine};
pub use types::{
    AllocationAlgorithm, AllocationStatus, ContainerStatus, FulfillmentStatus, LimitingFactor,
    Severity, ShipmentStatus, SuggestionPriority,
};
