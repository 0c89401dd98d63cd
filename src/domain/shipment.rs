// ==========================================
// 集装箱配载引擎 - 出运单领域模型
// ==========================================
// 职责: 出运单、行项目履约记录、操作上下文
// ==========================================

use crate::domain::types::{FulfillmentStatus, ShipmentStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Shipment - 出运单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: String,
    pub shipment_number: String,
    pub status: ShipmentStatus,

    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancel_reason: Option<String>,
}

// ==========================================
// ShipmentLine - 出运单行项目履约记录
// ==========================================
// 每个承诺行在本出运单内计划发运多少; 确认时标记全部/部分发运
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub shipment_id: String,
    pub source_line_id: String,
    pub quantity_planned: i64,
    pub status: FulfillmentStatus,
}

// ==========================================
// OperationContext - 写操作上下文
// ==========================================
// 所有写操作显式传入操作人与时间,不依赖隐式“当前用户/当前时间”
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    pub actor: String,
    pub at: NaiveDateTime,
}

impl OperationContext {
    pub fn new(actor: &str, at: NaiveDateTime) -> Self {
        Self {
            actor: actor.to_string(),
            at,
        }
    }
}
