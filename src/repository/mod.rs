// ==========================================
// 集装箱配载引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_with(conn, ..)` 在调用方事务内执行; `&self` 方法自行加锁
// ==========================================

pub mod action_log_repo;
pub mod allocation_repo;
pub mod container_repo;
pub mod container_type_repo;
pub(crate) mod convert;
pub mod error;
pub mod packing_box_type_repo;
pub mod shipment_repo;
pub mod source_line_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use allocation_repo::AllocationRepository;
pub use container_repo::ContainerRepository;
pub use container_type_repo::ContainerTypeRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use packing_box_type_repo::PackingBoxTypeRepository;
pub use shipment_repo::ShipmentRepository;
pub use source_line_repo::SourceLineRepository;
