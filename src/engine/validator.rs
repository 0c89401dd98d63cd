// ==========================================
// 集装箱配载引擎 - 容量校验引擎
// ==========================================
// 职责: 对单箱装载做容量校验、重量均衡评估、优化建议与综合评分
// 输入: 箱型 + 装载明细快照 (LoadItem)
// 红线: 只读; 永不返回 Err,一律以严重级别表达问题
// 红线: 恰好 100% 不是 error, 超过才是
// ==========================================

use crate::config::LoadingThresholds;
use crate::domain::allocation::AllocationRecord;
use crate::domain::container::{Container, ContainerType};
use crate::domain::types::{Severity, SuggestionPriority};
use crate::engine::capacity_model::utilization_pct;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 超限判定的相对容差（吸收浮点累加误差）
const EXCEED_TOLERANCE: f64 = 1e-9;

fn exceeds(current: f64, limit: f64) -> bool {
    current - limit > limit.abs() * EXCEED_TOLERANCE
}

// ==========================================
// 输入: 装载明细
// ==========================================

/// 校验所需的最小装载明细（单件毛重与体积）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadItem {
    pub weight_kg: f64,
    pub volume_cbm: f64,
}

impl LoadItem {
    /// 配载记录按件展开: quantity 个单件, 每件取记录的单件毛重与体积
    pub fn per_unit(record: &AllocationRecord) -> impl Iterator<Item = LoadItem> {
        let item = LoadItem {
            weight_kg: record.unit_weight_kg,
            volume_cbm: record.unit_volume_cbm,
        };
        std::iter::repeat(item).take(record.quantity.max(0) as usize)
    }
}

// ==========================================
// 输出: 报告结构
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    VolumeExceeded,
    VolumeNearLimit,
    VolumeUnderutilized,
    WeightExceeded,
    WeightNearLimit,
    HighWeightVariation,
    ModerateWeightVariation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    pub current: Option<f64>,
    pub limit: Option<f64>,
    pub utilization: Option<f64>,
}

/// 单一维度的容量指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityMetric {
    pub current: f64,
    pub limit: f64,
    pub utilization: f64,
    pub available: f64,
}

impl CapacityMetric {
    fn new(current: f64, limit: f64) -> Self {
        Self {
            current,
            limit,
            utilization: utilization_pct(current, limit),
            available: limit - current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub severity: Severity,
    pub message: String,
    pub volume: CapacityMetric,
    pub weight: CapacityMetric,
    pub box_count: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn highest_severity(&self) -> Severity {
        highest_severity(&self.issues)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceStatistics {
    pub total_weight: f64,
    pub average_weight: f64,
    pub std_deviation: f64,
    pub coefficient_variation: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub balanced: bool,
    pub severity: Severity,
    pub message: String,
    pub balance_score: f64,
    pub statistics: Option<BalanceStatistics>,
    pub issues: Vec<Issue>,
}

impl BalanceReport {
    pub fn highest_severity(&self) -> Severity {
        highest_severity(&self.issues)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    DownsizeContainer,
    OptimalUtilization,
    AddMoreCargo,
    RebalanceLoad,
    ConsolidateBoxes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub priority: SuggestionPriority,
    pub title: String,
    pub description: String,
    pub potential_savings: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub suggestions: Vec<Suggestion>,
    pub total_suggestions: usize,
    pub high_priority: usize,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub valid: bool,
    pub severity: Severity,
    pub overall_score: f64,
    pub capacity: ValidationReport,
    pub balance: BalanceReport,
    pub optimizations: OptimizationReport,
    pub summary: IssueSummary,
}

/// 追加装载前的预检结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCheck {
    pub can_fit: bool,
    pub volume: CapacityMetric, // 追加后
    pub weight: CapacityMetric, // 追加后
    pub issues: Vec<Issue>,
}

/// 问题列表的最高严重级别（空列表为 Info）
pub fn highest_severity(issues: &[Issue]) -> Severity {
    issues
        .iter()
        .map(|i| i.severity)
        .max()
        .unwrap_or(Severity::Info)
}

// ==========================================
// CapacityValidator - 容量校验引擎
// ==========================================
pub struct CapacityValidator {
    thresholds: LoadingThresholds,
}

impl Default for CapacityValidator {
    fn default() -> Self {
        Self::new(LoadingThresholds::default())
    }
}

impl CapacityValidator {
    pub fn new(thresholds: LoadingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &LoadingThresholds {
        &self.thresholds
    }

    // ==========================================
    // 容量校验
    // ==========================================

    /// 容量校验
    ///
    /// 体积/重量分别判定: 超限 error; 高于 near_limit_pct warning;
    /// 体积低于 underutilized_volume_pct info。valid = 无 error
    #[instrument(skip(self, items), fields(type_code = %container_type.code, items = items.len()))]
    pub fn validate_capacity(
        &self,
        container_type: &ContainerType,
        items: &[LoadItem],
    ) -> ValidationReport {
        let total_volume: f64 = items.iter().map(|i| i.volume_cbm).sum();
        let total_weight: f64 = items.iter().map(|i| i.weight_kg).sum();

        let volume = CapacityMetric::new(total_volume, container_type.capacity_cbm);
        let weight = CapacityMetric::new(total_weight, container_type.max_gross_weight);

        let mut issues = Vec::new();
        self.volume_issues(&volume, true, &mut issues);
        self.weight_issues(&weight, &mut issues);

        let valid = !issues.iter().any(|i| i.severity == Severity::Error);
        ValidationReport {
            valid,
            severity: highest_severity(&issues),
            message: if valid {
                "容量校验通过".to_string()
            } else {
                "容量校验未通过".to_string()
            },
            volume,
            weight,
            box_count: items.len(),
            issues,
        }
    }

    fn volume_issues(&self, volume: &CapacityMetric, report_underuse: bool, out: &mut Vec<Issue>) {
        if exceeds(volume.current, volume.limit) {
            out.push(Issue {
                issue_type: IssueType::VolumeExceeded,
                severity: Severity::Error,
                message: format!(
                    "体积超出箱型容积 {:.2} m³ ({:.1}%)",
                    volume.current - volume.limit,
                    volume.utilization - 100.0
                ),
                current: Some(volume.current),
                limit: Some(volume.limit),
                utilization: Some(volume.utilization),
            });
        } else if volume.utilization > self.thresholds.near_limit_pct {
            out.push(Issue {
                issue_type: IssueType::VolumeNearLimit,
                severity: Severity::Warning,
                message: format!("体积利用率过高 ({:.1}%)", volume.utilization),
                current: Some(volume.current),
                limit: Some(volume.limit),
                utilization: Some(volume.utilization),
            });
        } else if report_underuse && volume.utilization < self.thresholds.underutilized_volume_pct {
            out.push(Issue {
                issue_type: IssueType::VolumeUnderutilized,
                severity: Severity::Info,
                message: format!("体积利用率偏低 ({:.1}%), 可考虑换用更小箱型", volume.utilization),
                current: Some(volume.current),
                limit: Some(volume.limit),
                utilization: Some(volume.utilization),
            });
        }
    }

    fn weight_issues(&self, weight: &CapacityMetric, out: &mut Vec<Issue>) {
        if exceeds(weight.current, weight.limit) {
            out.push(Issue {
                issue_type: IssueType::WeightExceeded,
                severity: Severity::Error,
                message: format!(
                    "重量超出箱型限重 {:.2} kg ({:.1}%)",
                    weight.current - weight.limit,
                    weight.utilization - 100.0
                ),
                current: Some(weight.current),
                limit: Some(weight.limit),
                utilization: Some(weight.utilization),
            });
        } else if weight.utilization > self.thresholds.near_limit_pct {
            out.push(Issue {
                issue_type: IssueType::WeightNearLimit,
                severity: Severity::Warning,
                message: format!("重量利用率过高 ({:.1}%)", weight.utilization),
                current: Some(weight.current),
                limit: Some(weight.limit),
                utilization: Some(weight.utilization),
            });
        }
    }

    /// 追加重量/体积前的预检
    ///
    /// 以实箱当前汇总为基准; can_fit=false 时 issues 中含 *_exceeded
    pub fn validate_items_fit(
        &self,
        container: &Container,
        container_type: &ContainerType,
        additional_weight_kg: f64,
        additional_volume_cbm: f64,
    ) -> FitCheck {
        let volume = CapacityMetric::new(
            container.current_volume + additional_volume_cbm,
            container_type.capacity_cbm,
        );
        let weight = CapacityMetric::new(
            container.current_weight + additional_weight_kg,
            container_type.max_gross_weight,
        );

        let mut issues = Vec::new();
        self.volume_issues(&volume, false, &mut issues);
        self.weight_issues(&weight, &mut issues);

        FitCheck {
            can_fit: !issues.iter().any(|i| i.severity == Severity::Error),
            volume,
            weight,
            issues,
        }
    }

    // ==========================================
    // 重量均衡
    // ==========================================

    /// 重量均衡: 单件毛重变异系数 CV = 标准差/均值 × 100
    ///
    /// balance_score = max(0, 100 - CV)
    pub fn validate_balance(&self, items: &[LoadItem]) -> BalanceReport {
        if items.is_empty() {
            return BalanceReport {
                balanced: true,
                severity: Severity::Info,
                message: "无待校验件".to_string(),
                balance_score: 100.0,
                statistics: None,
                issues: Vec::new(),
            };
        }

        let n = items.len() as f64;
        let total: f64 = items.iter().map(|i| i.weight_kg).sum();
        let mean = total / n;
        let variance = items
            .iter()
            .map(|i| (i.weight_kg - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        let cv = if mean > 0.0 { std_dev / mean * 100.0 } else { 0.0 };
        let min = items.iter().map(|i| i.weight_kg).fold(f64::INFINITY, f64::min);
        let max = items.iter().map(|i| i.weight_kg).fold(f64::NEG_INFINITY, f64::max);

        let mut issues = Vec::new();
        let mut balanced = true;
        if cv > self.thresholds.balance_warning_cv {
            balanced = false;
            issues.push(Issue {
                issue_type: IssueType::HighWeightVariation,
                severity: Severity::Warning,
                message: "单件重量差异大, 建议重新分配".to_string(),
                current: Some(cv),
                limit: Some(self.thresholds.balance_warning_cv),
                utilization: None,
            });
        } else if cv > self.thresholds.balance_info_cv {
            issues.push(Issue {
                issue_type: IssueType::ModerateWeightVariation,
                severity: Severity::Info,
                message: "单件重量差异中等, 均衡可接受".to_string(),
                current: Some(cv),
                limit: Some(self.thresholds.balance_info_cv),
                utilization: None,
            });
        }

        BalanceReport {
            balanced,
            severity: highest_severity(&issues),
            message: if balanced {
                "重量分布均衡".to_string()
            } else {
                "重量分布需关注".to_string()
            },
            balance_score: (100.0 - cv).max(0.0),
            statistics: Some(BalanceStatistics {
                total_weight: total,
                average_weight: mean,
                std_deviation: std_dev,
                coefficient_variation: cv,
                min_weight: min,
                max_weight: max,
            }),
            issues,
        }
    }

    // ==========================================
    // 优化建议与评分
    // ==========================================

    /// 优化建议（按优先级 high > medium > low 排序）
    pub fn suggest_optimizations(
        &self,
        container_type: &ContainerType,
        items: &[LoadItem],
    ) -> OptimizationReport {
        let capacity = self.validate_capacity(container_type, items);
        let balance = self.validate_balance(items);
        self.optimizations_from(&capacity, &balance)
    }

    fn optimizations_from(
        &self,
        capacity: &ValidationReport,
        balance: &BalanceReport,
    ) -> OptimizationReport {
        let t = &self.thresholds;
        let vol_util = capacity.volume.utilization;
        let wt_util = capacity.weight.utilization;
        let mut suggestions = Vec::new();

        if vol_util < t.underutilized_volume_pct {
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::DownsizeContainer,
                priority: SuggestionPriority::Medium,
                title: "换用更小箱型".to_string(),
                description: format!("当前体积利用率仅 {:.1}%, 换用更小箱型可降低成本", vol_util),
                potential_savings: "降低成本".to_string(),
            });
        } else if vol_util > t.ideal_utilization_pct && vol_util < t.near_limit_pct {
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::OptimalUtilization,
                priority: SuggestionPriority::Low,
                title: "体积利用率良好".to_string(),
                description: format!("体积利用率 {:.1}%, 处于理想区间", vol_util),
                potential_savings: "无需调整".to_string(),
            });
        }

        if wt_util < t.add_cargo_weight_pct && vol_util < t.add_cargo_volume_pct {
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::AddMoreCargo,
                priority: SuggestionPriority::Medium,
                title: "可追加货物".to_string(),
                description: format!(
                    "重量利用率 {:.1}%, 体积利用率 {:.1}%, 尚可追加 {:.2} kg",
                    wt_util, vol_util, capacity.weight.available
                ),
                potential_savings: "降低单位重量成本".to_string(),
            });
        }

        if !balance.balanced {
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::RebalanceLoad,
                priority: SuggestionPriority::High,
                title: "重新均衡配载".to_string(),
                description: "重量分布不均, 重新分配各件以改善均衡与安全".to_string(),
                potential_savings: "提升安全性与装卸便利".to_string(),
            });
        }

        if capacity.box_count > t.consolidate_box_count && vol_util < t.consolidate_volume_pct {
            suggestions.push(Suggestion {
                suggestion_type: SuggestionType::ConsolidateBoxes,
                priority: SuggestionPriority::Low,
                title: "合并包装件".to_string(),
                description: format!(
                    "共 {} 件且利用率偏低, 可合并为更少的大件",
                    capacity.box_count
                ),
                potential_savings: "减少装卸时间".to_string(),
            });
        }

        // 稳定排序,同优先级保持规则顺序
        suggestions.sort_by_key(|s| s.priority);

        OptimizationReport {
            total_suggestions: suggestions.len(),
            high_priority: suggestions
                .iter()
                .filter(|s| s.priority == SuggestionPriority::High)
                .count(),
            overall_score: self.overall_score(capacity, balance),
            suggestions,
        }
    }

    /// 综合评分 = 0.5·容量分 + 0.3·均衡分 + 0.2·问题分, 截断到 [0, 100]
    pub fn overall_score(&self, capacity: &ValidationReport, balance: &BalanceReport) -> f64 {
        let ideal = self.thresholds.ideal_utilization_pct;
        let volume_score = 100.0 - (ideal - capacity.volume.utilization).abs();
        let weight_score = 100.0 - (ideal - capacity.weight.utilization).abs();
        let capacity_score = (volume_score + weight_score) / 2.0;

        let errors = count_severity(&capacity.issues, Severity::Error) as f64;
        let warnings = count_severity(&capacity.issues, Severity::Warning) as f64;
        let issue_score = (100.0 - 20.0 * errors - 10.0 * warnings).max(0.0);

        let score = capacity_score * 0.5 + balance.balance_score * 0.3 + issue_score * 0.2;
        score.clamp(0.0, 100.0)
    }

    /// 综合校验: 容量 + 均衡 + 优化建议
    ///
    /// valid = capacity.valid && balance.balanced
    #[instrument(skip(self, items), fields(type_code = %container_type.code, items = items.len()))]
    pub fn comprehensive_validation(
        &self,
        container_type: &ContainerType,
        items: &[LoadItem],
    ) -> ComprehensiveReport {
        let capacity = self.validate_capacity(container_type, items);
        let balance = self.validate_balance(items);
        let optimizations = self.optimizations_from(&capacity, &balance);

        let all_issues: Vec<Issue> = capacity
            .issues
            .iter()
            .chain(balance.issues.iter())
            .cloned()
            .collect();

        ComprehensiveReport {
            valid: capacity.valid && balance.balanced,
            severity: highest_severity(&all_issues),
            overall_score: optimizations.overall_score,
            summary: IssueSummary {
                total_issues: all_issues.len(),
                errors: count_severity(&all_issues, Severity::Error),
                warnings: count_severity(&all_issues, Severity::Warning),
                info: count_severity(&all_issues, Severity::Info),
            },
            capacity,
            balance,
            optimizations,
        }
    }
}

fn count_severity(issues: &[Issue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize, volume: f64, weight: f64) -> Vec<LoadItem> {
        (0..n)
            .map(|_| LoadItem {
                weight_kg: weight,
                volume_cbm: volume,
            })
            .collect()
    }

    fn twenty_ft() -> ContainerType {
        ContainerType::new("20GP", 28.0, 21500.0)
    }

    #[test]
    fn test_underutilized_container_is_valid_with_info() {
        // 10 件 0.5 m³ / 1000 kg
        let report = CapacityValidator::default().validate_capacity(&twenty_ft(), &items(10, 0.5, 1000.0));

        assert!(report.valid);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].issue_type, IssueType::VolumeUnderutilized);
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert_eq!(report.severity, Severity::Info);
        assert!((report.volume.current - 5.0).abs() < 1e-9);
        assert!((report.volume.available - 23.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_overflow_is_error() {
        // 体积 ×6 => 30 m³
        let report = CapacityValidator::default().validate_capacity(&twenty_ft(), &items(10, 3.0, 1000.0));

        assert!(!report.valid);
        assert_eq!(report.severity, Severity::Error);
        let issue = &report.issues[0];
        assert_eq!(issue.issue_type, IssueType::VolumeExceeded);
        assert!(issue.message.starts_with("体积超出箱型容积 2.00 m³"));
    }

    #[test]
    fn test_exactly_full_is_not_error_but_overflow_is() {
        let validator = CapacityValidator::default();
        let full = validator.validate_capacity(&twenty_ft(), &items(1, 28.0, 100.0));
        assert!(full.valid);
        assert_eq!(full.issues[0].issue_type, IssueType::VolumeNearLimit);
        assert_eq!(full.severity, Severity::Warning);

        let over = validator.validate_capacity(&twenty_ft(), &items(1, 28.0 * 1.00001, 100.0));
        assert!(!over.valid);
        assert_eq!(over.issues[0].issue_type, IssueType::VolumeExceeded);

        let heavy = validator.validate_capacity(&twenty_ft(), &items(1, 20.0, 21500.0));
        assert!(heavy.valid);
        assert_eq!(heavy.issues[0].issue_type, IssueType::WeightNearLimit);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = CapacityValidator::default();
        let load = items(7, 3.9, 2900.0);
        assert_eq!(
            validator.validate_capacity(&twenty_ft(), &load),
            validator.validate_capacity(&twenty_ft(), &load)
        );
    }

    #[test]
    fn test_balance_thresholds() {
        let validator = CapacityValidator::default();

        let even = validator.validate_balance(&items(5, 1.0, 500.0));
        assert!(even.balanced);
        assert_eq!(even.balance_score, 100.0);
        assert!(even.issues.is_empty());

        // 100 / 300: 均值 200, 标准差 100 => CV 50, 仅 info
        let mut moderate = items(1, 1.0, 100.0);
        moderate.extend(items(1, 1.0, 300.0));
        let report = validator.validate_balance(&moderate);
        assert!(report.balanced);
        assert_eq!(report.issues[0].issue_type, IssueType::ModerateWeightVariation);
        assert!((report.balance_score - 50.0).abs() < 1e-9);

        // 100 / 900: CV 80 => warning
        let mut uneven = items(1, 1.0, 100.0);
        uneven.extend(items(1, 1.0, 900.0));
        let report = validator.validate_balance(&uneven);
        assert!(!report.balanced);
        assert_eq!(report.severity, Severity::Warning);
        let stats = report.statistics.unwrap();
        assert_eq!(stats.min_weight, 100.0);
        assert_eq!(stats.max_weight, 900.0);
        assert!((stats.coefficient_variation - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_load_is_balanced() {
        let report = CapacityValidator::default().validate_balance(&[]);
        assert!(report.balanced);
        assert_eq!(report.balance_score, 100.0);
        assert!(report.statistics.is_none());
    }

    #[test]
    fn test_suggestions_sorted_by_priority() {
        // 25 件, 轻且不均衡, 体积利用率低
        let mut load = items(24, 0.2, 20.0);
        load.push(LoadItem {
            weight_kg: 900.0,
            volume_cbm: 0.2,
        });
        let report = CapacityValidator::default().suggest_optimizations(&twenty_ft(), &load);

        let kinds: Vec<SuggestionType> = report.suggestions.iter().map(|s| s.suggestion_type).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionType::RebalanceLoad,
                SuggestionType::DownsizeContainer,
                SuggestionType::AddMoreCargo,
                SuggestionType::ConsolidateBoxes,
            ]
        );
        assert_eq!(report.high_priority, 1);
        assert_eq!(report.total_suggestions, 4);
    }

    #[test]
    fn test_overall_score_at_ideal_point() {
        // 体积/重量均为 85%, 完全均衡, 无问题 => 100
        let ct = ContainerType::new("T", 100.0, 1000.0);
        let report = CapacityValidator::default().comprehensive_validation(&ct, &items(5, 17.0, 170.0));
        assert!(report.valid);
        assert!((report.overall_score - 100.0).abs() < 1e-9);
        assert_eq!(report.summary.total_issues, 0);
        assert_eq!(report.optimizations.high_priority, 0);
    }

    #[test]
    fn test_comprehensive_counts_issues() {
        let mut load = items(1, 30.0, 100.0);
        load.extend(items(1, 0.1, 2000.0));
        let report = CapacityValidator::default().comprehensive_validation(&twenty_ft(), &load);

        assert!(!report.valid);
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
    }

    #[test]
    fn test_items_fit_precheck() {
        let container = Container {
            container_id: "C1".into(),
            shipment_id: "S1".into(),
            container_number: "SHP-1-CNT001".into(),
            type_code: "20GP".into(),
            status: crate::domain::types::ContainerStatus::Draft,
            seal_number: None,
            sealed_at: None,
            sealed_by: None,
            current_weight: 21000.0,
            current_volume: 10.0,
            created_by: "tester".into(),
            created_at: chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let validator = CapacityValidator::default();

        let ok = validator.validate_items_fit(&container, &twenty_ft(), 500.0, 1.0);
        assert!(ok.can_fit);
        assert_eq!(ok.issues[0].issue_type, IssueType::WeightNearLimit);

        let too_heavy = validator.validate_items_fit(&container, &twenty_ft(), 501.0, 1.0);
        assert!(!too_heavy.can_fit);
        assert_eq!(too_heavy.issues[0].issue_type, IssueType::WeightExceeded);
    }
}
