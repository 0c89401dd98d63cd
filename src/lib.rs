// ==========================================
// 集装箱配载引擎 - 核心库
// ==========================================
// 职责: 集装箱容量计算、配载分配、容量校验、配载台账与生命周期管理
// 技术栈: Rust + SQLite
// 分层: domain -> engine (纯计算) -> repository (数据访问) -> api (事务入口)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 容量/配载/校验/生命周期规则
pub mod engine;

// 配置层 - 配载阈值
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AllocationAlgorithm, AllocationStatus, ContainerStatus, FulfillmentStatus, Severity,
    ShipmentStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, AllocationRecord, ConcurrencyConflict, Container, ContainerType,
    OperationContext, PackableUnit, PackingBoxType, RuleViolation, Shipment, SourceLine,
};

// 引擎
pub use engine::{AllocationPlan, BoxTypeAdvisor, CapacityValidator, ContainerAllocator};

// 配置
pub use config::{ConfigManager, LoadingThresholds};

// API
pub use api::{ApiError, ApiResult, LedgerApi, LifecycleApi, LoadingApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "集装箱配载引擎";
