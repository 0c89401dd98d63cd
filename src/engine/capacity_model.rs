// ==========================================
// 集装箱配载引擎 - 容量计算模型
// ==========================================
// 职责: 纯函数计算 体积 / 体积重 / 计费重 / 货运等级
// 红线: 无副作用; 仅对负数与非有限输入报错
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 空运体积重换算系数: 1 m³ ≈ 167 kg
pub const VOLUMETRIC_FACTOR_KG_PER_CBM: f64 = 167.0;

/// 1 m³ = 35.3147 ft³
pub const CUBIC_FEET_PER_CBM: f64 = 35.3147;

/// 1 kg = 2.20462 lb
pub const POUNDS_PER_KG: f64 = 2.20462;

/// 输入校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapacityInputError {
    #[error("输入值为负: {field}={value}")]
    Negative { field: &'static str, value: f64 },

    #[error("输入值非有限数: {field}")]
    NotFinite { field: &'static str },
}

/// 有限且非负
pub(crate) fn check(field: &'static str, value: f64) -> Result<f64, CapacityInputError> {
    if !value.is_finite() {
        return Err(CapacityInputError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(CapacityInputError::Negative { field, value });
    }
    Ok(value)
}

// ==========================================
// 体积
// ==========================================

/// 体积 (m³), 尺寸单位 mm
pub fn cbm(length_mm: f64, width_mm: f64, height_mm: f64) -> f64 {
    length_mm * width_mm * height_mm / 1e9
}

/// 体积 (m³), 尺寸单位 cm（目录口径）
pub fn cbm_from_cm(length_cm: f64, width_cm: f64, height_cm: f64) -> f64 {
    (length_cm / 100.0) * (width_cm / 100.0) * (height_cm / 100.0)
}

/// 带校验的体积计算
pub fn try_cbm(length_mm: f64, width_mm: f64, height_mm: f64) -> Result<f64, CapacityInputError> {
    Ok(cbm(
        check("length_mm", length_mm)?,
        check("width_mm", width_mm)?,
        check("height_mm", height_mm)?,
    ))
}

// ==========================================
// 重量
// ==========================================

/// 体积重 (kg)
pub fn volumetric_weight(cbm: f64) -> f64 {
    cbm * VOLUMETRIC_FACTOR_KG_PER_CBM
}

/// 计费重 = max(实重, 体积重)
pub fn chargeable_weight(actual_kg: f64, cbm: f64) -> f64 {
    actual_kg.max(volumetric_weight(cbm))
}

/// 带校验的计费重
pub fn try_chargeable_weight(actual_kg: f64, cbm: f64) -> Result<f64, CapacityInputError> {
    Ok(chargeable_weight(check("actual_kg", actual_kg)?, check("cbm", cbm)?))
}

/// 含包装总重
pub fn total_weight(unit_weight_kg: f64, quantity: i64, packaging_weight_kg: f64) -> f64 {
    (unit_weight_kg + packaging_weight_kg) * quantity as f64
}

/// 含包装总体积
pub fn total_volume(unit_volume_cbm: f64, quantity: i64, packaging_volume_cbm: f64) -> f64 {
    (unit_volume_cbm + packaging_volume_cbm) * quantity as f64
}

/// 密度 (kg/m³); 体积为 0 时返回 None
pub fn density_kg_per_cbm(weight_kg: f64, cbm: f64) -> Option<f64> {
    if cbm > 0.0 {
        Some(weight_kg / cbm)
    } else {
        None
    }
}

// ==========================================
// 货运等级 (NMFC 密度分级)
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FreightClass {
    Class500,
    Class400,
    Class300,
    Class250,
    Class175,
    Class125,
    Class100,
    Class92_5,
    Class85,
    Class70,
    Class60,
    Unknown,
}

impl fmt::Display for FreightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FreightClass::Class500 => "500",
            FreightClass::Class400 => "400",
            FreightClass::Class300 => "300",
            FreightClass::Class250 => "250",
            FreightClass::Class175 => "175",
            FreightClass::Class125 => "125",
            FreightClass::Class100 => "100",
            FreightClass::Class92_5 => "92.5",
            FreightClass::Class85 => "85",
            FreightClass::Class70 => "70",
            FreightClass::Class60 => "60",
            FreightClass::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// 密度断点 (lb/ft³ 上界, 等级, 描述); 最后一档 >= 30 为 Class 60
const DENSITY_BREAKPOINTS: [(f64, FreightClass, &str); 10] = [
    (1.0, FreightClass::Class500, "Very low density"),
    (2.0, FreightClass::Class400, "Low density"),
    (4.0, FreightClass::Class300, "Low density"),
    (6.0, FreightClass::Class250, "Medium-low density"),
    (8.0, FreightClass::Class175, "Medium-low density"),
    (10.0, FreightClass::Class125, "Medium density"),
    (12.0, FreightClass::Class100, "Medium density"),
    (15.0, FreightClass::Class92_5, "Medium-high density"),
    (22.5, FreightClass::Class85, "High density"),
    (30.0, FreightClass::Class70, "High density"),
];

/// 货运等级判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreightClassification {
    pub density_lb_ft3: f64,
    pub class: FreightClass,
    pub description: String,
}

/// 按密度判定货运等级
///
/// # 参数
/// - `weight_lb`: 重量 (lb)
/// - `cbm`: 体积 (m³), 内部换算为 ft³
///
/// # 返回
/// 体积为 0 时返回 `FreightClass::Unknown`
pub fn freight_class(weight_lb: f64, cbm: f64) -> FreightClassification {
    let cubic_feet = cbm * CUBIC_FEET_PER_CBM;
    if cubic_feet <= 0.0 || !cubic_feet.is_finite() {
        return FreightClassification {
            density_lb_ft3: 0.0,
            class: FreightClass::Unknown,
            description: "Invalid volume".to_string(),
        };
    }

    let density = weight_lb / cubic_feet;
    let (class, description) = DENSITY_BREAKPOINTS
        .iter()
        .find(|(upper, _, _)| density < *upper)
        .map(|(_, class, desc)| (*class, *desc))
        .unwrap_or((FreightClass::Class60, "Very high density"));

    FreightClassification {
        density_lb_ft3: density,
        class,
        description: description.to_string(),
    }
}

/// 带校验的货运等级判定
pub fn try_freight_class(weight_lb: f64, cbm: f64) -> Result<FreightClassification, CapacityInputError> {
    Ok(freight_class(check("weight_lb", weight_lb)?, check("cbm", cbm)?))
}

/// 百分比利用率; 上限为 0 时返回 0
pub fn utilization_pct(used: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        used / limit * 100.0
    } else {
        0.0
    }
}
