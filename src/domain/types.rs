// ==========================================
// 集装箱配载引擎 - 领域类型定义
// ==========================================
// 职责: 状态枚举、严重级别、优先级等封闭类型
// 红线: 状态一律用枚举 + 转移表表达,禁止散落的字符串比较
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 集装箱状态 (Container Status)
// ==========================================
// 流转: DRAFT -> PACKED -> SEALED -> IN_TRANSIT -> DELIVERED
//       SEALED -> PACKED 仅允许通过显式解封 (出运单处于 PREPARING)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    Draft,     // 草稿
    Packed,    // 已装箱
    Sealed,    // 已施封
    InTransit, // 运输中
    Delivered, // 已交付
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ContainerStatus {
    /// 从字符串解析状态（未知值返回 None,由调用方决定如何报错）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ContainerStatus::Draft),
            "PACKED" => Some(ContainerStatus::Packed),
            "SEALED" => Some(ContainerStatus::Sealed),
            "IN_TRANSIT" => Some(ContainerStatus::InTransit),
            "DELIVERED" => Some(ContainerStatus::Delivered),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ContainerStatus::Draft => "DRAFT",
            ContainerStatus::Packed => "PACKED",
            ContainerStatus::Sealed => "SEALED",
            ContainerStatus::InTransit => "IN_TRANSIT",
            ContainerStatus::Delivered => "DELIVERED",
        }
    }

    /// 是否允许增删配载记录
    pub fn is_mutable(&self) -> bool {
        matches!(self, ContainerStatus::Draft | ContainerStatus::Packed)
    }

    /// 转移表
    ///
    /// 注意: SEALED -> PACKED 只表达“状态机允许”,
    /// 出运单必须处于 PREPARING 的约束由 LifecycleApi::unseal 负责
    pub fn can_transition_to(&self, to: ContainerStatus) -> bool {
        use ContainerStatus::*;
        matches!(
            (self, to),
            (Draft, Packed)
                | (Packed, Sealed)
                | (Sealed, Packed)
                | (Sealed, InTransit)
                | (InTransit, Delivered)
        )
    }
}

// ==========================================
// 出运单状态 (Shipment Status)
// ==========================================
// 流转: DRAFT -> PREPARING -> CONFIRMED
//       DRAFT | PREPARING -> CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Draft,     // 草稿
    Preparing, // 备货中
    Confirmed, // 已确认（终态,不可再变更配载）
    Cancelled, // 已取消
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ShipmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ShipmentStatus::Draft),
            "PREPARING" => Some(ShipmentStatus::Preparing),
            "CONFIRMED" => Some(ShipmentStatus::Confirmed),
            "CANCELLED" => Some(ShipmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Draft => "DRAFT",
            ShipmentStatus::Preparing => "PREPARING",
            ShipmentStatus::Confirmed => "CONFIRMED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否允许变更其下集装箱与配载记录
    pub fn is_mutable(&self) -> bool {
        matches!(self, ShipmentStatus::Draft | ShipmentStatus::Preparing)
    }

    /// 转移表
    pub fn can_transition_to(&self, to: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, to),
            (Draft, Preparing)
                | (Preparing, Confirmed)
                | (Draft, Cancelled)
                | (Preparing, Cancelled)
        )
    }
}

// ==========================================
// 配载记录子状态 (Allocation Status)
// ==========================================
// DRAFT: 仅预留; PACKED: 已实际装入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Draft,
    Packed,
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AllocationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(AllocationStatus::Draft),
            "PACKED" => Some(AllocationStatus::Packed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AllocationStatus::Draft => "DRAFT",
            AllocationStatus::Packed => "PACKED",
        }
    }
}

// ==========================================
// 行项目履约状态 (Fulfillment Status)
// ==========================================
// 出运单确认时按累计已发运量 vs 承诺量标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Pending,        // 未确认
    PartialShipped, // 部分发运
    FullyShipped,   // 全部发运
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FulfillmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(FulfillmentStatus::Pending),
            "PARTIAL_SHIPPED" => Some(FulfillmentStatus::PartialShipped),
            "FULLY_SHIPPED" => Some(FulfillmentStatus::FullyShipped),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "PENDING",
            FulfillmentStatus::PartialShipped => "PARTIAL_SHIPPED",
            FulfillmentStatus::FullyShipped => "FULLY_SHIPPED",
        }
    }
}

// ==========================================
// 校验严重级别 (Severity)
// ==========================================
// 顺序: Info < Warning < Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 优化建议优先级 (Suggestion Priority)
// ==========================================
// 排序: High 在前
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

impl fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionPriority::High => write!(f, "high"),
            SuggestionPriority::Medium => write!(f, "medium"),
            SuggestionPriority::Low => write!(f, "low"),
        }
    }
}

// ==========================================
// 配载算法 (Allocation Algorithm)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationAlgorithm {
    BestFit,        // 最佳适配: 最少箱数
    WeightBalanced, // 重量均衡: 分散重载
}

impl fmt::Display for AllocationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationAlgorithm::BestFit => write!(f, "BEST_FIT"),
            AllocationAlgorithm::WeightBalanced => write!(f, "WEIGHT_BALANCED"),
        }
    }
}

impl AllocationAlgorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "BEST_FIT" => Some(AllocationAlgorithm::BestFit),
            "WEIGHT_BALANCED" => Some(AllocationAlgorithm::WeightBalanced),
            _ => None,
        }
    }
}

// ==========================================
// 限制因素 (Limiting Factor)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitingFactor {
    Volume,
    Weight,
}

impl fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitingFactor::Volume => write!(f, "volume"),
            LimitingFactor::Weight => write!(f, "weight"),
        }
    }
}
