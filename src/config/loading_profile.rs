use serde::{Deserialize, Serialize};

/// 配载阈值配置（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='loading/thresholds'，JSON）
/// 单项覆写：key='loading/{字段名}'
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingThresholds {
    /// 接近上限告警（%），严格大于时触发
    pub near_limit_pct: f64,

    /// 体积低利用率提示（%），严格小于时触发
    pub underutilized_volume_pct: f64,

    /// 理想利用率（%），综合评分以此为最优点
    pub ideal_utilization_pct: f64,

    /// 重量变异系数提示阈值
    pub balance_info_cv: f64,

    /// 重量变异系数告警阈值（超过即视为不均衡）
    pub balance_warning_cv: f64,

    /// “可继续加货”建议: 重量利用率低于此值
    pub add_cargo_weight_pct: f64,

    /// “可继续加货”建议: 体积利用率低于此值
    pub add_cargo_volume_pct: f64,

    /// “合并包装”建议: 箱件数超过此值
    pub consolidate_box_count: usize,

    /// “合并包装”建议: 体积利用率低于此值
    pub consolidate_volume_pct: f64,

    /// 推荐区间下限（%）
    pub recommended_min_pct: f64,

    /// 推荐区间上限（%）
    pub recommended_max_pct: f64,
}

impl Default for LoadingThresholds {
    fn default() -> Self {
        Self {
            near_limit_pct: 95.0,
            underutilized_volume_pct: 60.0,
            ideal_utilization_pct: 85.0,
            balance_info_cv: 30.0,
            balance_warning_cv: 50.0,
            add_cargo_weight_pct: 50.0,
            add_cargo_volume_pct: 70.0,
            consolidate_box_count: 20,
            consolidate_volume_pct: 70.0,
            recommended_min_pct: 70.0,
            recommended_max_pct: 95.0,
        }
    }
}

impl LoadingThresholds {
    /// 利用率是否落在推荐区间（闭区间）
    pub fn is_recommended(&self, pct: f64) -> bool {
        pct >= self.recommended_min_pct && pct <= self.recommended_max_pct
    }
}
