// ==========================================
// 集装箱配载引擎 - 配载记录与承诺行
// ==========================================
// 红线: quantity_remaining = quantity - quantity_shipped >= 0 任何时刻成立
// 红线: quantity_shipped 恒等于该行所有存活配载记录的数量之和
// ==========================================

use crate::domain::types::AllocationStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// SourceLine - 销售承诺行（如形式发票行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLine {
    pub source_line_id: String,
    pub commitment_id: String,    // 所属承诺单（形式发票）
    pub product_code: Option<String>,

    // ===== 数量 =====
    pub quantity: i64,            // 承诺总量
    pub quantity_shipped: i64,    // 已配载（随配载记录增删变化）

    // ===== 单件快照来源 =====
    pub unit_weight_kg: f64,
    pub unit_volume_cbm: f64,
    pub unit_price: f64,

    // ===== 并发控制 =====
    pub shipment_count: i64,      // 分批序号计数器（单调递增）
    pub revision: i64,            // 每次数量变化 +1
}

impl SourceLine {
    /// 剩余可配载数量
    pub fn quantity_remaining(&self) -> i64 {
        self.quantity - self.quantity_shipped
    }

    /// 是否可再配载指定数量
    pub fn can_ship(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.quantity_remaining()
    }
}

// ==========================================
// AllocationRecord - 配载记录
// ==========================================
// 一条记录 = 某承诺行的一部分数量装入某实箱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub record_id: String,
    pub container_id: String,
    pub shipment_id: String,
    pub source_line_id: String,

    // ===== 数量与快照 =====
    pub quantity: i64,
    pub unit_weight_kg: f64,
    pub total_weight_kg: f64,
    pub unit_volume_cbm: f64,
    pub total_volume_cbm: f64,
    pub unit_price: f64,
    pub customs_value: f64,       // quantity * unit_price

    // ===== 分批 =====
    pub shipment_sequence: i64,   // 承诺行第几次分批履约
    pub unit_ref: Option<String>, // 由装箱方案生成时对应的箱号

    pub status: AllocationStatus,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}
