// ==========================================
// 集装箱配载引擎 - 配载台账 API
// ==========================================
// 职责: 出运单/实箱/配载记录的增删,维护承诺行已配载数量
// 红线: quantity_remaining >= 0 在任何提交后成立
// 红线: quantity_shipped 恒等于存活配载记录之和,与记录增删同事务调整
// 红线: 每次写入同事务追加 action_log
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction};
use serde_json::json;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::transaction::run_immediate;
use crate::config::LoadingThresholds;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::allocation::{AllocationRecord, SourceLine};
use crate::domain::container::{Container, ContainerType};
use crate::domain::rules::{ConcurrencyConflict, RuleViolation};
use crate::domain::shipment::{OperationContext, Shipment, ShipmentLine};
use crate::domain::types::{AllocationStatus, ContainerStatus, FulfillmentStatus, ShipmentStatus};
use crate::engine::allocator::AllocationPlan;
use crate::engine::{capacity_model, lifecycle};
use crate::engine::validator::CapacityValidator;
use crate::repository::{
    ActionLogRepository, AllocationRepository, ContainerRepository, ContainerTypeRepository,
    ShipmentRepository, SourceLineRepository,
};

/// 单次配载的数量与单件快照
struct AllocationDraft<'a> {
    quantity: i64,
    unit_weight_kg: f64,
    unit_volume_cbm: f64,
    unit_ref: Option<&'a str>,
}

/// 配载台账 API
///
/// 职责：
/// 1. 出运单创建、承诺单关联、行项目计划
/// 2. 实箱创建与删除
/// 3. 配载记录增删（含容量预检与余量扣减）
/// 4. 配载计划落库
pub struct LedgerApi {
    conn: Arc<Mutex<Connection>>,
    validator: CapacityValidator,
}

impl LedgerApi {
    pub fn new(conn: Arc<Mutex<Connection>>, thresholds: LoadingThresholds) -> Self {
        Self {
            conn,
            validator: CapacityValidator::new(thresholds),
        }
    }

    // ==========================================
    // 出运单
    // ==========================================

    /// 创建 DRAFT 出运单
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn create_shipment(&self, shipment_number: &str, ctx: &OperationContext) -> ApiResult<Shipment> {
        let shipment_number = shipment_number.trim();
        if shipment_number.is_empty() {
            return Err(RuleViolation::InvalidInput("出运单号不能为空".to_string()).into());
        }

        run_immediate(&self.conn, "create_shipment", |tx| {
            let shipment = Shipment {
                shipment_id: uuid::Uuid::new_v4().to_string(),
                shipment_number: shipment_number.to_string(),
                status: ShipmentStatus::Draft,
                created_by: ctx.actor.clone(),
                created_at: ctx.at,
                confirmed_by: None,
                confirmed_at: None,
                cancelled_at: None,
                cancel_reason: None,
            };
            ShipmentRepository::insert_with(tx, &shipment)?;

            log_action(
                tx,
                ActionLog::new(ActionType::CreateShipment, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_payload(json!({ "shipment_number": shipment.shipment_number })),
            )?;

            info!(shipment_id = %shipment.shipment_id, "出运单已创建");
            Ok(shipment)
        })
    }

    /// 关联承诺单（重复关联幂等）
    ///
    /// # 返回
    /// - Ok(true): 新建关联
    /// - Ok(false): 已关联
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn link_commitment(
        &self,
        shipment_id: &str,
        commitment_id: &str,
        ctx: &OperationContext,
    ) -> ApiResult<bool> {
        if commitment_id.trim().is_empty() {
            return Err(RuleViolation::InvalidInput("承诺单号不能为空".to_string()).into());
        }

        run_immediate(&self.conn, "link_commitment", |tx| {
            let shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            lifecycle::ensure_shipment_mutable(&shipment)?;

            let created = ShipmentRepository::link_commitment_with(tx, shipment_id, commitment_id)?;
            if created {
                log_action(
                    tx,
                    ActionLog::new(ActionType::LinkCommitment, &ctx.actor, ctx.at)
                        .with_shipment(shipment_id)
                        .with_payload(json!({ "commitment_id": commitment_id })),
                )?;
            }
            Ok(created)
        })
    }

    /// 登记出运单对承诺行的计划发运数量
    ///
    /// 确认时“未配载数量” = Σ max(0, 计划 - 本单已配载)
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn plan_line(
        &self,
        shipment_id: &str,
        source_line_id: &str,
        quantity_planned: i64,
        ctx: &OperationContext,
    ) -> ApiResult<ShipmentLine> {
        if quantity_planned < 0 {
            return Err(RuleViolation::InvalidInput(format!(
                "计划数量不能为负: {}",
                quantity_planned
            ))
            .into());
        }

        run_immediate(&self.conn, "plan_line", |tx| {
            let shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            lifecycle::ensure_shipment_mutable(&shipment)?;

            let line = SourceLineRepository::get_with(tx, source_line_id)?;
            ensure_commitment_linked(tx, &shipment, &line)?;

            let planned = ShipmentLine {
                shipment_id: shipment_id.to_string(),
                source_line_id: source_line_id.to_string(),
                quantity_planned,
                status: FulfillmentStatus::Pending,
            };
            ShipmentRepository::upsert_line_with(tx, &planned)?;

            log_action(
                tx,
                ActionLog::new(ActionType::PlanLine, &ctx.actor, ctx.at)
                    .with_shipment(shipment_id)
                    .with_payload(json!({
                        "source_line_id": source_line_id,
                        "quantity_planned": quantity_planned,
                    })),
            )?;
            Ok(planned)
        })
    }

    // ==========================================
    // 实箱
    // ==========================================

    /// 创建 DRAFT 实箱,箱号 `<出运单号>-CNT<nnn>`
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn create_container(
        &self,
        shipment_id: &str,
        type_code: &str,
        ctx: &OperationContext,
    ) -> ApiResult<Container> {
        run_immediate(&self.conn, "create_container", |tx| {
            let shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            let container = create_container_in(tx, &shipment, type_code, ctx)?;
            info!(container_id = %container.container_id, number = %container.container_number, "实箱已创建");
            Ok(container)
        })
    }

    /// 删除实箱及其配载记录（回退承诺行已配载数量）
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn remove_container(&self, container_id: &str, ctx: &OperationContext) -> ApiResult<usize> {
        run_immediate(&self.conn, "remove_container", |tx| {
            let container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            lifecycle::ensure_allocation_mutable(&shipment, &container)?;

            let removed = purge_container(tx, &container)?;

            log_action(
                tx,
                ActionLog::new(ActionType::RemoveContainer, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(container_id)
                    .with_payload(json!({
                        "container_number": container.container_number,
                        "records_removed": removed,
                    })),
            )?;

            info!(container_id, records_removed = removed, "实箱已删除");
            Ok(removed)
        })
    }

    // ==========================================
    // 配载记录
    // ==========================================

    /// 新增配载记录
    ///
    /// # 参数
    /// - `expected_line_revision`: 调用方读取承诺行时的 revision; 锁内不一致即并发冲突
    ///
    /// # 校验顺序
    /// 数量 > 0 -> revision -> 剩余数量 -> 箱型容量 -> 承诺单关联 -> 出运单/实箱可变
    ///
    /// # 并发
    /// 写事务在锁内重读承诺行, 同一行的并发配载总是串行执行
    /// - 传入 `expected_line_revision`: 读到过期行的一方得到 `Concurrency(StaleLineRevision)`
    /// - 不传: 后执行的一方按锁内余量复核, 不足时得到 `Validation(InsufficientQuantity)`
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn add_allocation(
        &self,
        container_id: &str,
        source_line_id: &str,
        quantity: i64,
        unit_ref: Option<&str>,
        expected_line_revision: Option<i64>,
        ctx: &OperationContext,
    ) -> ApiResult<AllocationRecord> {
        if quantity <= 0 {
            return Err(RuleViolation::InvalidInput(format!("配载数量必须为正: {}", quantity)).into());
        }

        run_immediate(&self.conn, "add_allocation", |tx| {
            let container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            let line = SourceLineRepository::get_with(tx, source_line_id)?;

            if let Some(expected) = expected_line_revision {
                if line.revision != expected {
                    return Err(ConcurrencyConflict::StaleLineRevision {
                        source_line_id: source_line_id.to_string(),
                        expected,
                        actual: line.revision,
                    }
                    .into());
                }
            }

            let draft = AllocationDraft {
                quantity,
                unit_weight_kg: line.unit_weight_kg,
                unit_volume_cbm: line.unit_volume_cbm,
                unit_ref,
            };
            let record = self.allocate_in(tx, &shipment, &container, &line, &draft, ctx)?;

            info!(record_id = %record.record_id, quantity, "配载记录已新增");
            Ok(record)
        })
    }

    /// 删除配载记录（已配载数量回退）
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn remove_allocation(&self, record_id: &str, ctx: &OperationContext) -> ApiResult<()> {
        run_immediate(&self.conn, "remove_allocation", |tx| {
            let record = AllocationRepository::get_with(tx, record_id)?;
            let container = ContainerRepository::get_with(tx, &record.container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &record.shipment_id)?;
            lifecycle::ensure_allocation_mutable(&shipment, &container)?;

            AllocationRepository::delete_with(tx, record_id)?;
            release_quantity(tx, &record.source_line_id, record.quantity)?;
            ContainerRepository::refresh_totals_with(tx, &container.container_id)?;

            log_action(
                tx,
                ActionLog::new(ActionType::RemoveAllocation, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(&container.container_id)
                    .with_payload(json!({
                        "record_id": record_id,
                        "source_line_id": record.source_line_id,
                        "quantity": record.quantity,
                    })),
            )?;

            info!(record_id, quantity = record.quantity, "配载记录已删除");
            Ok(())
        })
    }

    /// 落库配载计划: 每个计划箱一个 DRAFT 实箱,每件一条配载记录
    ///
    /// 说明：
    /// - 每件按 `add_allocation` 同样的规则校验,任一失败整体回滚
    /// - 计划中的未装入件不落库,由确认时的未配载检查兜底
    #[instrument(skip(self, plan, ctx), fields(actor = %ctx.actor, containers = plan.containers.len()))]
    pub fn apply_plan(
        &self,
        shipment_id: &str,
        plan: &AllocationPlan,
        ctx: &OperationContext,
    ) -> ApiResult<Vec<Container>> {
        run_immediate(&self.conn, "apply_plan", |tx| {
            let shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            lifecycle::ensure_shipment_mutable(&shipment)?;

            let mut created = Vec::with_capacity(plan.containers.len());
            let mut record_count = 0usize;

            for planned in &plan.containers {
                let container =
                    create_container_in(tx, &shipment, &planned.container_type.code, ctx)?;

                for unit in &planned.units {
                    if unit.quantity <= 0 {
                        return Err(RuleViolation::InvalidInput(format!(
                            "箱件 {} 的数量必须为正",
                            unit.unit_id
                        ))
                        .into());
                    }
                    // 每件落库后实箱汇总已变化,重新读取
                    let current = ContainerRepository::get_with(tx, &container.container_id)?;
                    let line = SourceLineRepository::get_with(tx, &unit.source_line_id)?;
                    let quantity = unit.quantity as f64;
                    let draft = AllocationDraft {
                        quantity: unit.quantity,
                        unit_weight_kg: unit.gross_weight_kg / quantity,
                        unit_volume_cbm: unit.volume_cbm() / quantity,
                        unit_ref: Some(unit.unit_id.as_str()),
                    };
                    self.allocate_in(tx, &shipment, &current, &line, &draft, ctx)?;
                    record_count += 1;
                }

                created.push(ContainerRepository::get_with(tx, &container.container_id)?);
            }

            if !plan.unallocated.is_empty() {
                tracing::warn!(
                    shipment_id,
                    unallocated = plan.unallocated.len(),
                    "配载计划含未装入箱件,未落库"
                );
            }

            log_action(
                tx,
                ActionLog::new(ActionType::ApplyPlan, &ctx.actor, ctx.at)
                    .with_shipment(shipment_id)
                    .with_payload(json!({
                        "algorithm": plan.algorithm,
                        "containers": created.len(),
                        "records": record_count,
                        "unallocated": plan.unallocated.len(),
                    })),
            )?;

            info!(shipment_id, containers = created.len(), records = record_count, "配载计划已落库");
            Ok(created)
        })
    }

    /// 标记实箱已装箱: DRAFT 记录 -> PACKED, 实箱 DRAFT -> PACKED
    ///
    /// # 返回
    /// - Ok(n): 本次转为 PACKED 的记录数
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn mark_packed(&self, container_id: &str, ctx: &OperationContext) -> ApiResult<usize> {
        run_immediate(&self.conn, "mark_packed", |tx| {
            let container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            lifecycle::ensure_allocation_mutable(&shipment, &container)?;

            let records = AllocationRepository::list_by_container_with(tx, container_id)?;
            if records.is_empty() {
                return Err(RuleViolation::EmptyContainer {
                    container_id: container_id.to_string(),
                }
                .into());
            }

            if container.status == ContainerStatus::Draft {
                lifecycle::container_transition(&container, ContainerStatus::Packed)?;
                ContainerRepository::update_status_with(tx, container_id, ContainerStatus::Packed)?;
            }
            let packed = AllocationRepository::mark_packed_by_container_with(tx, container_id)?;

            log_action(
                tx,
                ActionLog::new(ActionType::MarkPacked, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(container_id)
                    .with_payload(json!({ "records_packed": packed })),
            )?;
            Ok(packed)
        })
    }

    // ==========================================
    // 内部: 单条配载（调用方已持有写事务）
    // ==========================================

    fn allocate_in(
        &self,
        tx: &Transaction<'_>,
        shipment: &Shipment,
        container: &Container,
        line: &SourceLine,
        draft: &AllocationDraft<'_>,
        ctx: &OperationContext,
    ) -> ApiResult<AllocationRecord> {
        // 1. 剩余数量
        if !line.can_ship(draft.quantity) {
            return Err(RuleViolation::InsufficientQuantity {
                source_line_id: line.source_line_id.clone(),
                requested: draft.quantity,
                remaining: line.quantity_remaining(),
            }
            .into());
        }

        // 2. 箱型容量
        let total_weight = capacity_model::total_weight(draft.unit_weight_kg, draft.quantity, 0.0);
        let total_volume = capacity_model::total_volume(draft.unit_volume_cbm, draft.quantity, 0.0);
        let container_type = load_container_type(tx, &container.type_code)?;
        let fit = self
            .validator
            .validate_items_fit(container, &container_type, total_weight, total_volume);
        if !fit.can_fit {
            let detail = fit
                .issues
                .iter()
                .filter(|i| i.severity == crate::domain::types::Severity::Error)
                .map(|i| i.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RuleViolation::CapacityExceeded {
                container_id: container.container_id.clone(),
                detail,
            }
            .into());
        }

        // 3. 承诺单关联
        ensure_commitment_linked(tx, shipment, line)?;

        // 4. 出运单/实箱可变
        lifecycle::ensure_allocation_mutable(shipment, container)?;

        // 5. 分批序号: 本单首次配载该行时推进计数器
        let shipment_sequence = match AllocationRepository::sequence_for_with(
            tx,
            &shipment.shipment_id,
            &line.source_line_id,
        )? {
            Some(seq) => seq,
            None => SourceLineRepository::next_shipment_sequence_with(tx, &line.source_line_id)?,
        };

        let record = AllocationRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            container_id: container.container_id.clone(),
            shipment_id: shipment.shipment_id.clone(),
            source_line_id: line.source_line_id.clone(),
            quantity: draft.quantity,
            unit_weight_kg: draft.unit_weight_kg,
            total_weight_kg: total_weight,
            unit_volume_cbm: draft.unit_volume_cbm,
            total_volume_cbm: total_volume,
            unit_price: line.unit_price,
            customs_value: line.unit_price * draft.quantity as f64,
            shipment_sequence,
            unit_ref: draft.unit_ref.map(str::to_string),
            status: AllocationStatus::Draft,
            created_by: ctx.actor.clone(),
            created_at: ctx.at,
        };
        AllocationRepository::insert_with(tx, &record)?;

        if !SourceLineRepository::apply_shipped_delta_with(tx, &line.source_line_id, draft.quantity)? {
            return Err(RuleViolation::InsufficientQuantity {
                source_line_id: line.source_line_id.clone(),
                requested: draft.quantity,
                remaining: line.quantity_remaining(),
            }
            .into());
        }
        ContainerRepository::refresh_totals_with(tx, &container.container_id)?;

        log_action(
            tx,
            ActionLog::new(ActionType::AddAllocation, &ctx.actor, ctx.at)
                .with_shipment(&shipment.shipment_id)
                .with_container(&container.container_id)
                .with_payload(json!({
                    "record_id": record.record_id,
                    "source_line_id": record.source_line_id,
                    "quantity": record.quantity,
                    "shipment_sequence": record.shipment_sequence,
                })),
        )?;

        Ok(record)
    }
}

// ==========================================
// 事务内辅助函数（LifecycleApi 共用）
// ==========================================

pub(crate) fn log_action(tx: &Transaction<'_>, log: ActionLog) -> ApiResult<()> {
    ActionLogRepository::insert_with(tx, &log)?;
    Ok(())
}

/// 回退承诺行已配载数量
pub(crate) fn release_quantity(tx: &Transaction<'_>, source_line_id: &str, quantity: i64) -> ApiResult<()> {
    if !SourceLineRepository::apply_shipped_delta_with(tx, source_line_id, -quantity)? {
        return Err(ApiError::InternalError(format!(
            "承诺行已配载数量与配载记录不一致: source_line={}",
            source_line_id
        )));
    }
    Ok(())
}

/// 删除实箱及其全部配载记录,返回删除的记录数
pub(crate) fn purge_container(tx: &Transaction<'_>, container: &Container) -> ApiResult<usize> {
    let records = AllocationRepository::list_by_container_with(tx, &container.container_id)?;
    for record in &records {
        release_quantity(tx, &record.source_line_id, record.quantity)?;
    }
    let removed = AllocationRepository::delete_by_container_with(tx, &container.container_id)?;
    ContainerRepository::delete_with(tx, &container.container_id)?;
    Ok(removed)
}

fn load_container_type(tx: &Transaction<'_>, type_code: &str) -> ApiResult<ContainerType> {
    ContainerTypeRepository::find_by_code_with(tx, type_code)?
        .ok_or_else(|| ApiError::not_found("ContainerType", type_code))
}

fn ensure_commitment_linked(tx: &Transaction<'_>, shipment: &Shipment, line: &SourceLine) -> ApiResult<()> {
    if ShipmentRepository::is_commitment_linked_with(tx, &shipment.shipment_id, &line.commitment_id)? {
        Ok(())
    } else {
        Err(RuleViolation::CommitmentNotLinked {
            shipment_id: shipment.shipment_id.clone(),
            commitment_id: line.commitment_id.clone(),
        }
        .into())
    }
}

fn create_container_in(
    tx: &Transaction<'_>,
    shipment: &Shipment,
    type_code: &str,
    ctx: &OperationContext,
) -> ApiResult<Container> {
    lifecycle::ensure_shipment_mutable(shipment)?;

    let container_type = load_container_type(tx, type_code)?;
    if !container_type.is_active {
        return Err(RuleViolation::InvalidInput(format!("箱型已停用: {}", type_code)).into());
    }

    let seq = ContainerRepository::max_container_seq_with(tx, &shipment.shipment_id)? + 1;
    let container = Container {
        container_id: uuid::Uuid::new_v4().to_string(),
        shipment_id: shipment.shipment_id.clone(),
        container_number: format!("{}-CNT{:03}", shipment.shipment_number, seq),
        type_code: container_type.code.clone(),
        status: ContainerStatus::Draft,
        seal_number: None,
        sealed_at: None,
        sealed_by: None,
        current_weight: 0.0,
        current_volume: 0.0,
        created_by: ctx.actor.clone(),
        created_at: ctx.at,
    };
    ContainerRepository::insert_with(tx, &container)?;

    log_action(
        tx,
        ActionLog::new(ActionType::CreateContainer, &ctx.actor, ctx.at)
            .with_shipment(&shipment.shipment_id)
            .with_container(&container.container_id)
            .with_payload(json!({
                "container_number": container.container_number,
                "type_code": container.type_code,
            })),
    )?;
    Ok(container)
}
