// ==========================================
// 集装箱配载引擎 - 配载分配引擎
// ==========================================
// 职责: 把包装件分配到集装箱（装箱决策,不落库）
// 输入: 包装件列表 + 候选箱型（可指定单一首选箱型）
// 输出: 不可变的 AllocationPlan（含无法装入的 unallocated）
// 红线: 只做体积/重量汇总运算,不做三维摆放
// 红线: 任一计划箱的体积/重量之和不得超过其箱型上限
// ==========================================

use crate::config::LoadingThresholds;
use crate::domain::container::{Container, ContainerType};
use crate::domain::packing::PackableUnit;
use crate::domain::types::{AllocationAlgorithm, LimitingFactor};
use crate::engine::capacity_model::utilization_pct;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

// ==========================================
// 输出结构
// ==========================================

/// 计划中的一个集装箱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedContainer {
    pub container_type: ContainerType,
    pub units: Vec<PackableUnit>,
    pub used_volume: f64,         // m³
    pub used_weight: f64,         // kg
    pub box_count: usize,
    pub utilization: f64,         // 体积利用率 (%)
    pub weight_utilization: f64,  // 重量利用率 (%)
    pub balance_score: Option<f64>, // 仅重量均衡算法输出
}

impl PlannedContainer {
    fn open(container_type: &ContainerType, unit: PackableUnit) -> Self {
        let mut planned = Self {
            container_type: container_type.clone(),
            units: Vec::new(),
            used_volume: 0.0,
            used_weight: 0.0,
            box_count: 0,
            utilization: 0.0,
            weight_utilization: 0.0,
            balance_score: None,
        };
        planned.push(unit);
        planned
    }

    fn remaining_volume(&self) -> f64 {
        self.container_type.capacity_cbm - self.used_volume
    }

    fn remaining_weight(&self) -> f64 {
        self.container_type.max_gross_weight - self.used_weight
    }

    fn can_fit(&self, unit: &PackableUnit) -> bool {
        self.remaining_volume() >= unit.volume_cbm() && self.remaining_weight() >= unit.gross_weight_kg
    }

    fn current_weight_utilization(&self) -> f64 {
        utilization_pct(self.used_weight, self.container_type.max_gross_weight)
    }

    fn push(&mut self, unit: PackableUnit) {
        self.used_volume += unit.volume_cbm();
        self.used_weight += unit.gross_weight_kg;
        self.box_count += 1;
        self.units.push(unit);
    }

    fn finalize(&mut self, with_balance: bool) {
        self.utilization = utilization_pct(self.used_volume, self.container_type.capacity_cbm);
        self.weight_utilization =
            utilization_pct(self.used_weight, self.container_type.max_gross_weight);
        if with_balance {
            self.balance_score = Some(100.0 - (self.utilization - self.weight_utilization).abs());
        }
    }
}

/// 配载计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub algorithm: AllocationAlgorithm,
    pub containers: Vec<PlannedContainer>,
    pub unallocated: Vec<PackableUnit>,
    pub total_units: usize,
    pub allocated_units: usize,
    pub average_utilization: f64,
    pub average_balance: Option<f64>,
}

impl AllocationPlan {
    pub fn total_containers(&self) -> usize {
        self.containers.len()
    }

    /// 是否全部装入
    pub fn is_complete(&self) -> bool {
        self.unallocated.is_empty()
    }
}

/// 箱型建议（按箱型估算所需箱数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSuggestion {
    pub container_type: ContainerType,
    pub quantity: i64,
    pub volume_utilization: f64,
    pub weight_utilization: f64,
    pub efficiency_score: f64,
    pub limiting_factor: LimitingFactor,
    pub is_recommended: bool,
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<ContainerSuggestion>,
    pub total_volume: f64,
    pub total_weight: f64,
    pub box_count: usize,
    pub recommended: Option<ContainerSuggestion>,
}

/// 出运单整体装载效率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingEfficiency {
    pub container_count: usize,
    pub average_volume_utilization: f64,
    pub average_weight_utilization: f64,
    pub wasted_volume: f64,
    pub wasted_weight: f64,
    pub efficiency_score: f64,
}

// ==========================================
// ContainerAllocator - 配载分配引擎
// ==========================================
pub struct ContainerAllocator {
    thresholds: LoadingThresholds,
}

impl Default for ContainerAllocator {
    fn default() -> Self {
        Self::new(LoadingThresholds::default())
    }
}

impl ContainerAllocator {
    pub fn new(thresholds: LoadingThresholds) -> Self {
        Self { thresholds }
    }

    /// 按算法分配
    pub fn allocate(
        &self,
        algorithm: AllocationAlgorithm,
        units: &[PackableUnit],
        candidate_types: &[ContainerType],
        preferred: Option<&ContainerType>,
    ) -> AllocationPlan {
        match algorithm {
            AllocationAlgorithm::BestFit => self.best_fit(units, candidate_types, preferred),
            AllocationAlgorithm::WeightBalanced => {
                self.weight_balanced(units, candidate_types, preferred)
            }
        }
    }

    /// 最佳适配: 体积降序,优先塞满已开箱
    ///
    /// 新开箱: 按容积升序选第一个能容纳该件的箱型
    #[instrument(skip_all, fields(units = units.len(), types = candidate_types.len()))]
    pub fn best_fit(
        &self,
        units: &[PackableUnit],
        candidate_types: &[ContainerType],
        preferred: Option<&ContainerType>,
    ) -> AllocationPlan {
        let types = ordered_types(candidate_types, preferred, |a, b| {
            cmp_f64(a.capacity_cbm, b.capacity_cbm)
        });

        let (mut sorted, mut unallocated) = partition_well_formed(units);
        sorted.sort_by(|a, b| cmp_f64(b.volume_cbm(), a.volume_cbm()));

        let mut containers: Vec<PlannedContainer> = Vec::new();

        for unit in sorted {
            if let Some(open) = containers.iter_mut().find(|c| c.can_fit(&unit)) {
                open.push(unit);
                continue;
            }
            match first_type_that_holds(&types, &unit) {
                Some(t) => containers.push(PlannedContainer::open(t, unit)),
                None => unallocated.push(unit),
            }
        }

        let plan = build_plan(AllocationAlgorithm::BestFit, containers, unallocated, units.len());
        tracing::debug!(
            containers = plan.containers.len(),
            unallocated = plan.unallocated.len(),
            "best-fit 分配完成"
        );
        plan
    }

    /// 重量均衡: 重量降序,放入可容纳且当前重量利用率最低的箱
    ///
    /// 并列时取先开的箱; 新开箱按承重降序选箱型
    #[instrument(skip_all, fields(units = units.len(), types = candidate_types.len()))]
    pub fn weight_balanced(
        &self,
        units: &[PackableUnit],
        candidate_types: &[ContainerType],
        preferred: Option<&ContainerType>,
    ) -> AllocationPlan {
        let types = ordered_types(candidate_types, preferred, |a, b| {
            cmp_f64(b.max_gross_weight, a.max_gross_weight)
        });

        let (mut sorted, mut unallocated) = partition_well_formed(units);
        sorted.sort_by(|a, b| cmp_f64(b.gross_weight_kg, a.gross_weight_kg));

        let mut containers: Vec<PlannedContainer> = Vec::new();

        for unit in sorted {
            let mut best: Option<(usize, f64)> = None;
            for (idx, c) in containers.iter().enumerate() {
                if !c.can_fit(&unit) {
                    continue;
                }
                let util = c.current_weight_utilization();
                match best {
                    Some((_, lowest)) if util >= lowest => {}
                    _ => best = Some((idx, util)),
                }
            }

            if let Some((idx, _)) = best {
                containers[idx].push(unit);
                continue;
            }
            match first_type_that_holds(&types, &unit) {
                Some(t) => containers.push(PlannedContainer::open(t, unit)),
                None => unallocated.push(unit),
            }
        }

        let plan = build_plan(
            AllocationAlgorithm::WeightBalanced,
            containers,
            unallocated,
            units.len(),
        );
        tracing::debug!(
            containers = plan.containers.len(),
            unallocated = plan.unallocated.len(),
            "weight-balanced 分配完成"
        );
        plan
    }

    /// 箱型建议（suggest 模式）
    ///
    /// 每个启用箱型: 所需箱数 = max(ceil(总体积/容积), ceil(总重/承重));
    /// 效率 = min((体积利用率 + 重量利用率)/2, 100), 降序排列
    #[instrument(skip_all, fields(units = units.len(), types = container_types.len()))]
    pub fn suggest_container_types(
        &self,
        units: &[PackableUnit],
        container_types: &[ContainerType],
    ) -> SuggestionSet {
        let total_volume: f64 = units.iter().map(|u| u.volume_cbm()).sum();
        let total_weight: f64 = units.iter().map(|u| u.gross_weight_kg).sum();

        if units.is_empty() {
            return SuggestionSet {
                suggestions: Vec::new(),
                total_volume,
                total_weight,
                box_count: 0,
                recommended: None,
            };
        }

        let mut suggestions: Vec<ContainerSuggestion> = container_types
            .iter()
            .filter(|t| t.is_active && t.capacity_cbm > 0.0 && t.max_gross_weight > 0.0)
            .map(|t| {
                let by_volume = (total_volume / t.capacity_cbm).ceil() as i64;
                let by_weight = (total_weight / t.max_gross_weight).ceil() as i64;
                let quantity = by_volume.max(by_weight).max(1);

                let volume_util = utilization_pct(total_volume, t.capacity_cbm * quantity as f64);
                let weight_util =
                    utilization_pct(total_weight, t.max_gross_weight * quantity as f64);
                let efficiency_score = ((volume_util + weight_util) / 2.0).min(100.0);

                ContainerSuggestion {
                    container_type: t.clone(),
                    quantity,
                    volume_utilization: volume_util.min(100.0),
                    weight_utilization: weight_util.min(100.0),
                    efficiency_score,
                    limiting_factor: if by_volume > by_weight {
                        LimitingFactor::Volume
                    } else {
                        LimitingFactor::Weight
                    },
                    is_recommended: self.thresholds.is_recommended(efficiency_score),
                    estimated_cost: t.estimated_cost.map(|c| c * quantity as f64),
                }
            })
            .collect();

        suggestions.sort_by(|a, b| cmp_f64(b.efficiency_score, a.efficiency_score));
        let recommended = suggestions.first().cloned();

        SuggestionSet {
            suggestions,
            total_volume,
            total_weight,
            box_count: units.len(),
            recommended,
        }
    }

    /// 出运单装载效率（已落库的实箱）
    ///
    /// # 参数
    /// - `loads`: (实箱, 对应箱型)
    pub fn loading_efficiency(&self, loads: &[(Container, ContainerType)]) -> LoadingEfficiency {
        if loads.is_empty() {
            return LoadingEfficiency {
                container_count: 0,
                average_volume_utilization: 0.0,
                average_weight_utilization: 0.0,
                wasted_volume: 0.0,
                wasted_weight: 0.0,
                efficiency_score: 0.0,
            };
        }

        let n = loads.len() as f64;
        let mut volume_util_sum = 0.0;
        let mut weight_util_sum = 0.0;
        let mut wasted_volume = 0.0;
        let mut wasted_weight = 0.0;

        for (container, container_type) in loads {
            volume_util_sum += utilization_pct(container.current_volume, container_type.capacity_cbm);
            weight_util_sum +=
                utilization_pct(container.current_weight, container_type.max_gross_weight);
            wasted_volume += (container_type.capacity_cbm - container.current_volume).max(0.0);
            wasted_weight += (container_type.max_gross_weight - container.current_weight).max(0.0);
        }

        let average_volume_utilization = volume_util_sum / n;
        let average_weight_utilization = weight_util_sum / n;

        LoadingEfficiency {
            container_count: loads.len(),
            average_volume_utilization,
            average_weight_utilization,
            wasted_volume,
            wasted_weight,
            efficiency_score: ((average_volume_utilization + average_weight_utilization) / 2.0)
                .min(100.0),
        }
    }
}

// ==========================================
// 内部辅助
// ==========================================

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// 候选箱型: 指定首选时只用首选,否则取启用箱型并排序
fn ordered_types<F>(
    candidate_types: &[ContainerType],
    preferred: Option<&ContainerType>,
    order: F,
) -> Vec<ContainerType>
where
    F: FnMut(&ContainerType, &ContainerType) -> Ordering,
{
    if let Some(p) = preferred {
        return vec![p.clone()];
    }
    let mut types: Vec<ContainerType> =
        candidate_types.iter().filter(|t| t.is_active).cloned().collect();
    types.sort_by(order);
    types
}

/// 尺寸或毛重非法（负数 / NaN / 无穷）的件不参与装箱,直接计入 unallocated
fn partition_well_formed(units: &[PackableUnit]) -> (Vec<PackableUnit>, Vec<PackableUnit>) {
    units.iter().cloned().partition(|unit| match unit.try_volume_cbm() {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(unit_id = %unit.unit_id, error = %e, "包装件输入非法,不参与装箱");
            false
        }
    })
}

fn first_type_that_holds<'a>(
    types: &'a [ContainerType],
    unit: &PackableUnit,
) -> Option<&'a ContainerType> {
    types
        .iter()
        .find(|t| t.can_ever_hold(unit.volume_cbm(), unit.gross_weight_kg))
}

fn build_plan(
    algorithm: AllocationAlgorithm,
    mut containers: Vec<PlannedContainer>,
    unallocated: Vec<PackableUnit>,
    total_units: usize,
) -> AllocationPlan {
    let with_balance = algorithm == AllocationAlgorithm::WeightBalanced;
    for c in containers.iter_mut() {
        c.finalize(with_balance);
    }

    let (average_utilization, average_balance) = if containers.is_empty() {
        (0.0, if with_balance { Some(0.0) } else { None })
    } else {
        let n = containers.len() as f64;
        let avg_util = containers.iter().map(|c| c.utilization).sum::<f64>() / n;
        let avg_balance = if with_balance {
            Some(containers.iter().filter_map(|c| c.balance_score).sum::<f64>() / n)
        } else {
            None
        };
        (avg_util, avg_balance)
    };

    AllocationPlan {
        algorithm,
        allocated_units: total_units - unallocated.len(),
        containers,
        unallocated,
        total_units,
        average_utilization,
        average_balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, cbm: f64, weight: f64) -> PackableUnit {
        // 以 1m x 1m x cbm(m) 表示体积
        PackableUnit {
            unit_id: id.to_string(),
            length_mm: 1000.0,
            width_mm: 1000.0,
            height_mm: cbm * 1000.0,
            gross_weight_kg: weight,
            net_weight_kg: weight,
            source_line_id: "L1".to_string(),
            quantity: 1,
        }
    }

    fn types_20_40() -> Vec<ContainerType> {
        vec![
            ContainerType::new("40GP", 58.0, 26000.0),
            ContainerType::new("20GP", 28.0, 21500.0),
        ]
    }

    #[test]
    fn test_malformed_units_are_left_unallocated() {
        let mut negative = unit("NEG", 1.0, 500.0);
        negative.height_mm = -2000.0;
        let mut nan_weight = unit("NAN", 1.0, 500.0);
        nan_weight.gross_weight_kg = f64::NAN;
        let mut units = vec![negative, nan_weight];
        for i in 0..3 {
            units.push(unit(&format!("U{}", i), 9.0, 1000.0));
        }

        let allocator = ContainerAllocator::default();
        for plan in [
            allocator.best_fit(&units, &types_20_40(), None),
            allocator.weight_balanced(&units, &types_20_40(), None),
        ] {
            let mut rejected: Vec<&str> = plan.unallocated.iter().map(|u| u.unit_id.as_str()).collect();
            rejected.sort();
            assert_eq!(rejected, vec!["NAN", "NEG"]);
            assert_eq!(plan.allocated_units, 3);
            assert_eq!(plan.total_units, 5);
            // 负体积不得抵扣其他件的占用
            for c in &plan.containers {
                assert!(c.used_volume >= 0.0);
                assert!(c.used_volume <= c.container_type.capacity_cbm);
                assert!(c.used_weight.is_finite());
            }
        }
    }

    #[test]
    fn test_best_fit_opens_smallest_type_that_holds_largest_unit() {
        // 一件 30 m³ / 20t 的大件 + 10 件 1 m³ / 1t
        let mut units = vec![unit("BIG", 30.0, 20000.0)];
        for i in 0..10 {
            units.push(unit(&format!("U{}", i), 1.0, 1000.0));
        }

        let plan = ContainerAllocator::default().best_fit(&units, &types_20_40(), None);

        assert!(plan.is_complete());
        assert_eq!(plan.total_containers(), 2);
        assert_eq!(plan.containers[0].container_type.code, "40GP");
        assert_eq!(plan.containers[0].units[0].unit_id, "BIG");
        // 40GP 剩余承重 6t => 再装 6 件
        assert_eq!(plan.containers[0].box_count, 7);
        assert_eq!(plan.containers[1].container_type.code, "20GP");
        assert_eq!(plan.containers[1].box_count, 4);
        assert_eq!(plan.allocated_units, 11);
        assert!(plan.average_balance.is_none());
    }

    #[test]
    fn test_unit_too_large_for_every_type_is_unallocated() {
        let units = vec![unit("HUGE", 70.0, 100.0), unit("OK", 1.0, 100.0)];
        let plan = ContainerAllocator::default().best_fit(&units, &types_20_40(), None);

        assert_eq!(plan.unallocated.len(), 1);
        assert_eq!(plan.unallocated[0].unit_id, "HUGE");
        assert_eq!(plan.allocated_units, 1);
        assert_eq!(plan.containers[0].container_type.code, "20GP");
    }

    #[test]
    fn test_preferred_type_is_the_only_candidate() {
        let units = vec![unit("A", 1.0, 100.0)];
        let preferred = ContainerType::new("40HQ", 68.0, 26500.0);
        let plan =
            ContainerAllocator::default().best_fit(&units, &types_20_40(), Some(&preferred));
        assert_eq!(plan.containers[0].container_type.code, "40HQ");
    }

    #[test]
    fn test_inactive_types_are_ignored() {
        let mut types = types_20_40();
        types[1].is_active = false;
        let plan = ContainerAllocator::default().best_fit(&[unit("A", 1.0, 10.0)], &types, None);
        assert_eq!(plan.containers[0].container_type.code, "40GP");
    }

    #[test]
    fn test_weight_balanced_spreads_heavy_units() {
        let types = vec![ContainerType::new("20GP", 28.0, 21500.0)];
        // 4 件各 10t: 每箱最多 2 件
        let units: Vec<PackableUnit> =
            (0..4).map(|i| unit(&format!("H{}", i), 1.0, 10000.0)).collect();
        let light: Vec<PackableUnit> =
            (0..2).map(|i| unit(&format!("L{}", i), 1.0, 500.0)).collect();
        let all: Vec<PackableUnit> = units.into_iter().chain(light).collect();

        let plan = ContainerAllocator::default().weight_balanced(&all, &types, None);

        assert!(plan.is_complete());
        assert_eq!(plan.total_containers(), 2);
        for c in &plan.containers {
            assert!(c.used_weight <= c.container_type.max_gross_weight);
            assert!(c.balance_score.is_some());
        }
        // 两件轻货各落一箱
        let light_counts: Vec<usize> = plan
            .containers
            .iter()
            .map(|c| c.units.iter().filter(|u| u.unit_id.starts_with('L')).count())
            .collect();
        assert_eq!(light_counts, vec![1, 1]);
        assert!(plan.average_balance.is_some());
    }

    #[test]
    fn test_planned_containers_never_exceed_limits() {
        let units: Vec<PackableUnit> = (0..50)
            .map(|i| unit(&format!("U{}", i), 0.5 + (i % 7) as f64, 300.0 + (i % 5) as f64 * 900.0))
            .collect();
        let allocator = ContainerAllocator::default();

        for algo in [AllocationAlgorithm::BestFit, AllocationAlgorithm::WeightBalanced] {
            let plan = allocator.allocate(algo, &units, &types_20_40(), None);
            assert!(plan.is_complete());
            for c in &plan.containers {
                let vol: f64 = c.units.iter().map(|u| u.volume_cbm()).sum();
                let wt: f64 = c.units.iter().map(|u| u.gross_weight_kg).sum();
                assert!(vol <= c.container_type.capacity_cbm + 1e-9);
                assert!(wt <= c.container_type.max_gross_weight + 1e-9);
            }
        }
    }

    #[test]
    fn test_suggestions_ranked_by_efficiency() {
        // 50 m³ / 10t
        let units: Vec<PackableUnit> =
            (0..10).map(|i| unit(&format!("U{}", i), 5.0, 1000.0)).collect();
        let mut types = types_20_40();
        types[0].estimated_cost = Some(3000.0);
        types.push(ContainerType {
            is_active: false,
            ..ContainerType::new("45HQ", 86.0, 27000.0)
        });

        let set = ContainerAllocator::default().suggest_container_types(&units, &types);

        assert_eq!(set.suggestions.len(), 2);
        let top = set.recommended.unwrap();
        // 40GP: 1 箱, 效率 (86.2 + 38.5)/2; 20GP: 2 箱, 效率 (89.3 + 23.3)/2
        assert_eq!(top.container_type.code, "40GP");
        assert_eq!(top.quantity, 1);
        assert_eq!(top.estimated_cost, Some(3000.0));
        assert_eq!(set.suggestions[1].container_type.code, "20GP");
        assert_eq!(set.suggestions[1].quantity, 2);
        assert_eq!(set.suggestions[1].limiting_factor, LimitingFactor::Volume);
        assert!(set.suggestions[0].efficiency_score >= set.suggestions[1].efficiency_score);
    }

    #[test]
    fn test_suggestions_empty_for_no_units() {
        let set = ContainerAllocator::default().suggest_container_types(&[], &types_20_40());
        assert!(set.suggestions.is_empty());
        assert!(set.recommended.is_none());
    }
}
