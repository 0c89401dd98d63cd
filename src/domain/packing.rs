// ==========================================
// 集装箱配载引擎 - 装箱单元领域模型
// ==========================================
// 职责: 待配载的包装件 (PackableUnit) 与包装箱型目录 (PackingBoxType)
// 来源: 外部装箱登记,本引擎只读
// ==========================================

use crate::engine::capacity_model;
use serde::{Deserialize, Serialize};

// ==========================================
// PackableUnit - 包装件（箱）
// ==========================================
// 尺寸单位: mm; 重量单位: kg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackableUnit {
    pub unit_id: String,          // 箱号
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub gross_weight_kg: f64,
    pub net_weight_kg: f64,
    pub source_line_id: String,   // 履约的承诺行
    pub quantity: i64,            // 箱内对应承诺行的数量
}

impl PackableUnit {
    /// 体积 (m³)
    pub fn volume_cbm(&self) -> f64 {
        capacity_model::cbm(self.length_mm, self.width_mm, self.height_mm)
    }

    /// 带校验的体积: 三边与毛重须为有限非负值
    pub fn try_volume_cbm(&self) -> Result<f64, capacity_model::CapacityInputError> {
        capacity_model::check("gross_weight_kg", self.gross_weight_kg)?;
        capacity_model::try_cbm(self.length_mm, self.width_mm, self.height_mm)
    }
}

// ==========================================
// PackingBoxType - 包装箱型目录
// ==========================================
// 尺寸单位: cm（与目录维护口径一致）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingBoxType {
    pub code: String,
    pub name: Option<String>,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub max_weight_kg: f64,
    pub max_volume_cbm: f64,
    pub unit_cost: Option<f64>,
    pub is_active: bool,
}

// ==========================================
// ProductDimensions - 产品单件规格
// ==========================================
// 由外部产品主数据提供; 尺寸单位 cm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl ProductDimensions {
    pub fn volume_cbm(&self) -> f64 {
        capacity_model::cbm_from_cm(self.length_cm, self.width_cm, self.height_cm)
    }
}
