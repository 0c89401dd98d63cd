// ==========================================
// 集装箱配载引擎 - 集装箱领域模型
// ==========================================
// 职责: 箱型目录 (ContainerType) 与实箱 (Container)
// 红线: ContainerType 只读; Container 的当前重量/体积只能由配载记录汇总得出
// ==========================================

use crate::domain::types::ContainerStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ContainerType - 箱型目录
// ==========================================
// 例: 20GP / 40GP / 40HQ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerType {
    pub code: String,             // 箱型代码
    pub name: Option<String>,     // 显示名称
    pub capacity_cbm: f64,        // 容积上限 (m³)
    pub max_gross_weight: f64,    // 毛重上限 (kg)
    pub estimated_cost: Option<f64>, // 预估运费（单箱）
    pub is_active: bool,          // 是否启用
}

impl ContainerType {
    /// 创建启用状态的箱型
    pub fn new(code: &str, capacity_cbm: f64, max_gross_weight: f64) -> Self {
        Self {
            code: code.to_string(),
            name: None,
            capacity_cbm,
            max_gross_weight,
            estimated_cost: None,
            is_active: true,
        }
    }

    /// 单件货物是否可能装入此箱型（绝对上限,不考虑已用量）
    pub fn can_ever_hold(&self, volume_cbm: f64, weight_kg: f64) -> bool {
        volume_cbm <= self.capacity_cbm && weight_kg <= self.max_gross_weight
    }
}

// ==========================================
// Container - 实箱
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    // ===== 主键 =====
    pub container_id: String,
    pub shipment_id: String,
    pub container_number: String, // <出运单号>-CNT<nnn>

    // ===== 箱型与状态 =====
    pub type_code: String,
    pub status: ContainerStatus,

    // ===== 施封 =====
    pub seal_number: Option<String>, // 施封后全局唯一
    pub sealed_at: Option<NaiveDateTime>,
    pub sealed_by: Option<String>,

    // ===== 汇总缓存 (配载记录之和) =====
    pub current_weight: f64, // kg
    pub current_volume: f64, // m³

    // ===== 审计 =====
    pub created_by: String,
    pub created_at: NaiveDateTime,
}
