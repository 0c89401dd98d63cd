// ==========================================
// 集装箱配载引擎 - 包装箱型建议
// ==========================================
// 职责: 装箱前的包装箱型选择与性价比排序
// 输入: 产品规格 + 数量 + 箱型目录快照
// 红线: 只读,不落库
// ==========================================

use crate::config::LoadingThresholds;
use crate::domain::packing::{PackingBoxType, ProductDimensions};
use crate::engine::capacity_model::{self, utilization_pct};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 单个箱型的装箱分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxTypeAnalysis {
    pub box_type_code: String,
    pub box_type_name: Option<String>,
    pub items_per_box: i64,
    pub boxes_needed: i64,
    pub volume_utilization: f64, // 满箱体积利用率 (%)
    pub weight_utilization: f64, // 满箱重量利用率 (%)
    pub total_cost: f64,
    pub score: f64,
    pub is_recommended: bool,
}

/// 按总量对比箱型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxTypeComparison {
    pub box_type_code: String,
    pub box_type_name: Option<String>,
    pub boxes_needed: i64,
    pub weight_utilization: f64,
    pub volume_utilization: f64,
    pub avg_utilization: f64,
    pub total_cost: f64,
    pub cost_per_m3: f64,
    pub is_recommended: bool,
}

// ==========================================
// BoxTypeAdvisor
// ==========================================
pub struct BoxTypeAdvisor {
    thresholds: LoadingThresholds,
}

impl Default for BoxTypeAdvisor {
    fn default() -> Self {
        Self::new(LoadingThresholds::default())
    }
}

impl BoxTypeAdvisor {
    pub fn new(thresholds: LoadingThresholds) -> Self {
        Self { thresholds }
    }

    /// 选出能容纳指定内容的最小箱型
    ///
    /// # 参数
    /// - 尺寸单位 cm, 重量 kg
    ///
    /// # 返回
    /// 按 max_volume_cbm 升序的第一个可用箱型; 无则 None
    pub fn suggest_box_type<'a>(
        &self,
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
        weight_kg: f64,
        box_types: &'a [PackingBoxType],
    ) -> Option<&'a PackingBoxType> {
        let required_volume = capacity_model::cbm_from_cm(length_cm, width_cm, height_cm);

        let mut candidates: Vec<&PackingBoxType> = box_types
            .iter()
            .filter(|t| t.is_active)
            .filter(|t| t.max_weight_kg >= weight_kg && t.max_volume_cbm >= required_volume)
            .collect();
        candidates.sort_by(|a, b| {
            a.max_volume_cbm
                .partial_cmp(&b.max_volume_cbm)
                .unwrap_or(Ordering::Equal)
        });
        candidates.into_iter().next()
    }

    /// 按性价比对箱型排序
    ///
    /// 每箱件数 = min(各维度整除件数之积, 承重整除件数, 容积整除件数);
    /// 放不下单件的箱型直接跳过。
    /// 排序: score 降序, 总成本升序
    #[tracing::instrument(skip(self, box_types), fields(types = box_types.len()))]
    pub fn rank_box_types(
        &self,
        product: &ProductDimensions,
        quantity: i64,
        box_types: &[PackingBoxType],
    ) -> Vec<BoxTypeAnalysis> {
        let item_volume = product.volume_cbm();

        let mut analyses: Vec<BoxTypeAnalysis> = box_types
            .iter()
            .filter(|t| t.is_active)
            .filter_map(|t| {
                let items_per_box = items_per_box(product, item_volume, t);
                if items_per_box <= 0 {
                    return None;
                }
                let boxes_needed = if quantity > 0 {
                    (quantity + items_per_box - 1) / items_per_box
                } else {
                    0
                };
                let volume_utilization =
                    utilization_pct(item_volume * items_per_box as f64, t.max_volume_cbm);
                let weight_utilization =
                    utilization_pct(product.weight_kg * items_per_box as f64, t.max_weight_kg);
                let score = (volume_utilization + weight_utilization) / 2.0;

                Some(BoxTypeAnalysis {
                    box_type_code: t.code.clone(),
                    box_type_name: t.name.clone(),
                    items_per_box,
                    boxes_needed,
                    volume_utilization,
                    weight_utilization,
                    total_cost: boxes_needed as f64 * t.unit_cost.unwrap_or(0.0),
                    score,
                    is_recommended: self.thresholds.is_recommended(score),
                })
            })
            .collect();

        analyses.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.total_cost.partial_cmp(&b.total_cost).unwrap_or(Ordering::Equal))
        });
        analyses
    }

    /// 按总重/总体积对比所有启用箱型
    pub fn compare_box_types(
        &self,
        total_weight_kg: f64,
        total_volume_cbm: f64,
        box_types: &[PackingBoxType],
    ) -> Vec<BoxTypeComparison> {
        let mut comparisons: Vec<BoxTypeComparison> = box_types
            .iter()
            .filter(|t| t.is_active && t.max_weight_kg > 0.0 && t.max_volume_cbm > 0.0)
            .map(|t| {
                let by_weight = (total_weight_kg / t.max_weight_kg).ceil() as i64;
                let by_volume = (total_volume_cbm / t.max_volume_cbm).ceil() as i64;
                let boxes_needed = by_weight.max(by_volume).max(1);

                let weight_utilization =
                    utilization_pct(total_weight_kg, boxes_needed as f64 * t.max_weight_kg);
                let volume_utilization =
                    utilization_pct(total_volume_cbm, boxes_needed as f64 * t.max_volume_cbm);
                let avg_utilization = (weight_utilization + volume_utilization) / 2.0;

                let total_cost = boxes_needed as f64 * t.unit_cost.unwrap_or(0.0);
                let cost_per_m3 = if total_cost > 0.0 && total_volume_cbm > 0.0 {
                    total_cost / total_volume_cbm
                } else {
                    0.0
                };

                BoxTypeComparison {
                    box_type_code: t.code.clone(),
                    box_type_name: t.name.clone(),
                    boxes_needed,
                    weight_utilization,
                    volume_utilization,
                    avg_utilization,
                    total_cost,
                    cost_per_m3,
                    is_recommended: self.thresholds.is_recommended(avg_utilization),
                }
            })
            .collect();

        comparisons.sort_by(|a, b| {
            b.avg_utilization
                .partial_cmp(&a.avg_utilization)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.total_cost.partial_cmp(&b.total_cost).unwrap_or(Ordering::Equal))
        });
        comparisons
    }
}

fn items_per_box(product: &ProductDimensions, item_volume: f64, box_type: &PackingBoxType) -> i64 {
    if product.length_cm <= 0.0 || product.width_cm <= 0.0 || product.height_cm <= 0.0 {
        return 0;
    }

    let by_dimensions = (box_type.length_cm / product.length_cm).floor()
        * (box_type.width_cm / product.width_cm).floor()
        * (box_type.height_cm / product.height_cm).floor();

    let by_weight = if product.weight_kg > 0.0 {
        (box_type.max_weight_kg / product.weight_kg).floor()
    } else {
        f64::INFINITY
    };

    let by_volume = if item_volume > 0.0 {
        (box_type.max_volume_cbm / item_volume + 1e-9).floor()
    } else {
        f64::INFINITY
    };

    let n = by_dimensions.min(by_weight).min(by_volume);
    if n.is_finite() && n > 0.0 {
        n as i64
    } else {
        0
    }
}
