// ==========================================
// 集装箱配载引擎 - 配载分析 API（只读）
// ==========================================
// 职责: 容量校验、综合评分、箱型建议、配载计划、包装箱型建议
// 红线: 只读,不加写锁,不写 action_log
// 说明: 计算本身不会失败; 错误只来自数据读取
// ==========================================

use std::sync::Arc;

use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::LoadingThresholds;
use crate::domain::container::{Container, ContainerType};
use crate::domain::packing::{PackableUnit, PackingBoxType, ProductDimensions};
use crate::domain::types::AllocationAlgorithm;
use crate::engine::allocator::{AllocationPlan, ContainerAllocator, LoadingEfficiency, SuggestionSet};
use crate::engine::box_type_advisor::{BoxTypeAdvisor, BoxTypeAnalysis, BoxTypeComparison};
use crate::engine::validator::{CapacityValidator, ComprehensiveReport, LoadItem, ValidationReport};
use crate::repository::{
    AllocationRepository, ContainerRepository, ContainerTypeRepository, PackingBoxTypeRepository,
};

/// 配载分析 API
pub struct LoadingApi {
    container_repo: Arc<ContainerRepository>,
    container_type_repo: Arc<ContainerTypeRepository>,
    allocation_repo: Arc<AllocationRepository>,
    packing_box_type_repo: Arc<PackingBoxTypeRepository>,
    validator: CapacityValidator,
    allocator: ContainerAllocator,
    advisor: BoxTypeAdvisor,
}

impl LoadingApi {
    pub fn new(
        container_repo: Arc<ContainerRepository>,
        container_type_repo: Arc<ContainerTypeRepository>,
        allocation_repo: Arc<AllocationRepository>,
        packing_box_type_repo: Arc<PackingBoxTypeRepository>,
        thresholds: LoadingThresholds,
    ) -> Self {
        Self {
            container_repo,
            container_type_repo,
            allocation_repo,
            packing_box_type_repo,
            validator: CapacityValidator::new(thresholds.clone()),
            allocator: ContainerAllocator::new(thresholds.clone()),
            advisor: BoxTypeAdvisor::new(thresholds),
        }
    }

    // ==========================================
    // 实箱校验
    // ==========================================

    /// 校验实箱当前装载
    pub fn validate_container(&self, container_id: &str) -> ApiResult<ValidationReport> {
        let (container_type, items) = self.load_items(container_id)?;
        Ok(self.validator.validate_capacity(&container_type, &items))
    }

    /// 实箱综合校验（容量 + 均衡 + 优化建议）
    pub fn comprehensive_validation(&self, container_id: &str) -> ApiResult<ComprehensiveReport> {
        let (container_type, items) = self.load_items(container_id)?;
        Ok(self.validator.comprehensive_validation(&container_type, &items))
    }

    /// 出运单装载效率
    pub fn loading_efficiency(&self, shipment_id: &str) -> ApiResult<LoadingEfficiency> {
        let containers = self.container_repo.list_by_shipment(shipment_id)?;
        let mut loads: Vec<(Container, ContainerType)> = Vec::with_capacity(containers.len());
        for container in containers {
            let container_type = self.require_type(&container.type_code)?;
            loads.push((container, container_type));
        }
        Ok(self.allocator.loading_efficiency(&loads))
    }

    // ==========================================
    // 配载计划与箱型建议
    // ==========================================

    /// 生成配载计划（不落库,落库见 LedgerApi::apply_plan）
    ///
    /// # 参数
    /// - `preferred_type`: 指定优先箱型代码; 不存在即 NotFound
    #[instrument(skip(self, units), fields(units = units.len()))]
    pub fn plan(
        &self,
        algorithm: AllocationAlgorithm,
        units: &[PackableUnit],
        preferred_type: Option<&str>,
    ) -> ApiResult<AllocationPlan> {
        let types = self.container_type_repo.list_active()?;
        let preferred = match preferred_type {
            Some(code) => Some(self.require_type(code)?),
            None => None,
        };
        Ok(self
            .allocator
            .allocate(algorithm, units, &types, preferred.as_ref()))
    }

    /// 按启用箱型估算所需箱数并排序
    pub fn suggest_container_types(&self, units: &[PackableUnit]) -> ApiResult<SuggestionSet> {
        let types = self.container_type_repo.list_active()?;
        Ok(self.allocator.suggest_container_types(units, &types))
    }

    // ==========================================
    // 包装箱型
    // ==========================================

    /// 能容纳指定内容的最小包装箱型
    pub fn suggest_box_type(
        &self,
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
        weight_kg: f64,
    ) -> ApiResult<Option<PackingBoxType>> {
        let types = self.packing_box_type_repo.list_active()?;
        Ok(self
            .advisor
            .suggest_box_type(length_cm, width_cm, height_cm, weight_kg, &types)
            .cloned())
    }

    pub fn rank_box_types(
        &self,
        product: &ProductDimensions,
        quantity: i64,
    ) -> ApiResult<Vec<BoxTypeAnalysis>> {
        let types = self.packing_box_type_repo.list_active()?;
        Ok(self.advisor.rank_box_types(product, quantity, &types))
    }

    pub fn compare_box_types(
        &self,
        total_weight_kg: f64,
        total_volume_cbm: f64,
    ) -> ApiResult<Vec<BoxTypeComparison>> {
        let types = self.packing_box_type_repo.list_active()?;
        Ok(self
            .advisor
            .compare_box_types(total_weight_kg, total_volume_cbm, &types))
    }

    // ==========================================
    // 内部
    // ==========================================

    fn require_type(&self, code: &str) -> ApiResult<ContainerType> {
        self.container_type_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::not_found("ContainerType", code))
    }

    fn load_items(&self, container_id: &str) -> ApiResult<(ContainerType, Vec<LoadItem>)> {
        let container = self
            .container_repo
            .find_by_id(container_id)?
            .ok_or_else(|| ApiError::not_found("Container", container_id))?;
        let container_type = self.require_type(&container.type_code)?;
        let items = self
            .allocation_repo
            .list_by_container(container_id)?
            .iter()
            .flat_map(LoadItem::per_unit)
            .collect();
        Ok((container_type, items))
    }
}
