// ==========================================
// 集装箱配载引擎 - 业务规则违反与并发冲突
// ==========================================
// 职责: 封闭枚举列出所有可被拒绝的业务规则,调用方必须逐一处理
// 红线: 规则违反原样返回调用方,引擎不降级、不重试
// ==========================================

use crate::domain::types::{ContainerStatus, ShipmentStatus};
use thiserror::Error;

/// 业务规则违反
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("剩余可配载数量不足: source_line={source_line_id}, 请求={requested}, 剩余={remaining}")]
    InsufficientQuantity {
        source_line_id: String,
        requested: i64,
        remaining: i64,
    },

    #[error("超出箱型容量: container={container_id}, {detail}")]
    CapacityExceeded { container_id: String, detail: String },

    #[error("承诺单未关联到出运单: shipment={shipment_id}, commitment={commitment_id}")]
    CommitmentNotLinked {
        shipment_id: String,
        commitment_id: String,
    },

    #[error("出运单状态不允许变更: shipment={shipment_id}, status={status}")]
    ShipmentNotMutable {
        shipment_id: String,
        status: ShipmentStatus,
    },

    #[error("集装箱状态不允许变更: container={container_id}, status={status}")]
    ContainerNotMutable {
        container_id: String,
        status: ContainerStatus,
    },

    #[error("集装箱为空,必须至少有一条配载记录: container={container_id}")]
    EmptyContainer { container_id: String },

    #[error("存在未实际装箱的配载记录: container={container_id}, 未装箱={count}")]
    UnpackedItems { container_id: String, count: usize },

    #[error("封条号已被使用: {seal_number}")]
    DuplicateSealNumber { seal_number: String },

    #[error("无效的状态转换: {entity} from={from} to={to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("出运单下没有集装箱: shipment={shipment_id}")]
    NoContainers { shipment_id: String },

    #[error("存在未施封的集装箱: shipment={shipment_id}, 未施封={count}")]
    UnsealedContainers { shipment_id: String, count: usize },

    #[error("存在未配载的计划数量: shipment={shipment_id}, 未配载={count}")]
    UnallocatedUnits { shipment_id: String, count: i64 },

    #[error("无效输入: {0}")]
    InvalidInput(String),
}

/// 并发冲突: 承诺行在本事务读取之后已被其他事务消耗
///
/// 调用方可重新读取状态后重试
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConcurrencyConflict {
    #[error("承诺行版本已变化: source_line={source_line_id}, expected_revision={expected}, actual_revision={actual}")]
    StaleLineRevision {
        source_line_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("确认时剩余数量不足: source_line={source_line_id}, 本单配载={allocated_here}, 可用={available}")]
    CommitmentConsumed {
        source_line_id: String,
        allocated_here: i64,
        available: i64,
    },
}
