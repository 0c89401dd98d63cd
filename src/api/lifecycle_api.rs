// ==========================================
// 集装箱配载引擎 - 生命周期 API
// ==========================================
// 职责: 施封/解封/发运/交付, 出运单备货/确认/取消
// 红线: 任一前置条件失败即整体拒绝,不存在“部分施封/部分确认”
// 红线: 确认时逐行复核承诺余量,被其他出运单抢占则返回并发冲突
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::api::error::ApiResult;
use crate::api::ledger_api::{log_action, purge_container};
use crate::api::transaction::run_immediate;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::container::Container;
use crate::domain::rules::RuleViolation;
use crate::domain::shipment::{OperationContext, Shipment, ShipmentLine};
use crate::domain::types::{ContainerStatus, ShipmentStatus};
use crate::engine::lifecycle;
use crate::repository::{
    AllocationRepository, ContainerRepository, ShipmentRepository, SourceLineRepository,
};

/// 取消结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelSummary {
    pub shipment_id: String,
    pub containers_removed: usize,
    pub records_removed: usize,
}

/// 确认结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSummary {
    pub shipment: Shipment,
    pub lines: Vec<ShipmentLine>,
}

/// 生命周期 API
pub struct LifecycleApi {
    conn: Arc<Mutex<Connection>>,
}

impl LifecycleApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ==========================================
    // 出运单
    // ==========================================

    /// DRAFT -> PREPARING
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn start_preparing(&self, shipment_id: &str, ctx: &OperationContext) -> ApiResult<Shipment> {
        run_immediate(&self.conn, "start_preparing", |tx| {
            let mut shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            lifecycle::shipment_transition(&shipment, ShipmentStatus::Preparing)?;
            ShipmentRepository::update_status_with(tx, shipment_id, ShipmentStatus::Preparing)?;
            shipment.status = ShipmentStatus::Preparing;

            log_action(
                tx,
                ActionLog::new(ActionType::StartPreparing, &ctx.actor, ctx.at).with_shipment(shipment_id),
            )?;
            Ok(shipment)
        })
    }

    /// 确认出运单
    ///
    /// # 前置条件
    /// - PREPARING -> CONFIRMED 合法
    /// - 至少一个实箱,且全部已施封
    /// - 计划数量全部已配载
    /// - 每个涉及的承诺行: 本单配载量 <= 扣除其他出运单占用后的余量
    ///
    /// # 返回
    /// 确认后的出运单与各行履约状态（FULLY_SHIPPED / PARTIAL_SHIPPED）
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn confirm(&self, shipment_id: &str, ctx: &OperationContext) -> ApiResult<ConfirmSummary> {
        run_immediate(&self.conn, "confirm", |tx| {
            let mut shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            let containers = ContainerRepository::list_by_shipment_with(tx, shipment_id)?;
            let planned = ShipmentRepository::list_lines_with(tx, shipment_id)?;
            let allocated: HashMap<String, i64> =
                AllocationRepository::sum_by_line_for_shipment_with(tx, shipment_id)?
                    .into_iter()
                    .collect();

            let unallocated: i64 = planned
                .iter()
                .map(|p| {
                    let here = allocated.get(&p.source_line_id).copied().unwrap_or(0);
                    (p.quantity_planned - here).max(0)
                })
                .sum();
            lifecycle::ensure_confirmable(&shipment, &containers, unallocated)?;

            // 并发复核在任何写入之前完成
            let mut touched: Vec<(&String, i64)> = allocated.iter().map(|(k, v)| (k, *v)).collect();
            touched.sort();
            let mut lines = Vec::with_capacity(touched.len());
            for (source_line_id, allocated_here) in touched {
                let line = SourceLineRepository::get_with(tx, source_line_id)?;
                lifecycle::check_line_available(&line, allocated_here)?;
                lines.push((line, allocated_here));
            }

            let mut fulfilled = Vec::with_capacity(lines.len());
            for (line, allocated_here) in &lines {
                let quantity_planned = planned
                    .iter()
                    .find(|p| p.source_line_id == line.source_line_id)
                    .map(|p| p.quantity_planned)
                    .unwrap_or(*allocated_here);
                let record = ShipmentLine {
                    shipment_id: shipment_id.to_string(),
                    source_line_id: line.source_line_id.clone(),
                    quantity_planned,
                    status: lifecycle::fulfillment_status(line),
                };
                ShipmentRepository::upsert_line_with(tx, &record)?;
                fulfilled.push(record);
            }

            ShipmentRepository::mark_confirmed_with(tx, shipment_id, &ctx.actor, &ctx.at)?;
            shipment.status = ShipmentStatus::Confirmed;
            shipment.confirmed_by = Some(ctx.actor.clone());
            shipment.confirmed_at = Some(ctx.at);

            log_action(
                tx,
                ActionLog::new(ActionType::Confirm, &ctx.actor, ctx.at)
                    .with_shipment(shipment_id)
                    .with_payload(json!({
                        "containers": containers.len(),
                        "lines": fulfilled
                            .iter()
                            .map(|l| json!({ "source_line_id": l.source_line_id, "status": l.status }))
                            .collect::<Vec<_>>(),
                    })),
            )?;

            info!(shipment_id, containers = containers.len(), lines = fulfilled.len(), "出运单已确认");
            Ok(ConfirmSummary {
                shipment,
                lines: fulfilled,
            })
        })
    }

    /// 取消出运单: 级联删除全部实箱（含已施封）与配载记录,回退承诺行已配载数量
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn cancel(&self, shipment_id: &str, reason: &str, ctx: &OperationContext) -> ApiResult<CancelSummary> {
        run_immediate(&self.conn, "cancel", |tx| {
            let shipment = ShipmentRepository::get_with(tx, shipment_id)?;
            lifecycle::shipment_transition(&shipment, ShipmentStatus::Cancelled)?;

            let containers = ContainerRepository::list_by_shipment_with(tx, shipment_id)?;
            let mut records_removed = 0;
            for container in &containers {
                records_removed += purge_container(tx, container)?;
            }

            ShipmentRepository::mark_cancelled_with(tx, shipment_id, reason, &ctx.at)?;

            log_action(
                tx,
                ActionLog::new(ActionType::Cancel, &ctx.actor, ctx.at)
                    .with_shipment(shipment_id)
                    .with_payload(json!({
                        "containers_removed": containers.len(),
                        "records_removed": records_removed,
                    }))
                    .with_detail(reason),
            )?;

            info!(shipment_id, containers = containers.len(), records_removed, "出运单已取消");
            Ok(CancelSummary {
                shipment_id: shipment_id.to_string(),
                containers_removed: containers.len(),
                records_removed,
            })
        })
    }

    // ==========================================
    // 实箱
    // ==========================================

    /// 施封
    ///
    /// 至少一条记录、全部已装箱、封条号全库唯一
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn seal(&self, container_id: &str, seal_number: &str, ctx: &OperationContext) -> ApiResult<Container> {
        let seal_number = seal_number.trim();
        if seal_number.is_empty() {
            return Err(RuleViolation::InvalidInput("封条号不能为空".to_string()).into());
        }

        run_immediate(&self.conn, "seal", |tx| {
            let container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            let records = AllocationRepository::list_by_container_with(tx, container_id)?;
            lifecycle::ensure_sealable(&shipment, &container, &records)?;

            if ContainerRepository::seal_number_exists_with(tx, seal_number)? {
                return Err(RuleViolation::DuplicateSealNumber {
                    seal_number: seal_number.to_string(),
                }
                .into());
            }

            ContainerRepository::set_seal_with(tx, container_id, seal_number, &ctx.actor, &ctx.at)?;

            log_action(
                tx,
                ActionLog::new(ActionType::Seal, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(container_id)
                    .with_payload(json!({ "seal_number": seal_number, "records": records.len() })),
            )?;

            info!(container_id, seal_number, "实箱已施封");
            Ok(ContainerRepository::get_with(tx, container_id)?)
        })
    }

    /// 解封: SEALED -> PACKED, 仅出运单 PREPARING
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn unseal(&self, container_id: &str, ctx: &OperationContext) -> ApiResult<Container> {
        run_immediate(&self.conn, "unseal", |tx| {
            let container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            lifecycle::ensure_unsealable(&shipment, &container)?;

            ContainerRepository::clear_seal_with(tx, container_id)?;

            log_action(
                tx,
                ActionLog::new(ActionType::Unseal, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(container_id)
                    .with_payload(json!({ "seal_number": container.seal_number })),
            )?;
            Ok(ContainerRepository::get_with(tx, container_id)?)
        })
    }

    /// 发运: SEALED -> IN_TRANSIT, 出运单须已确认
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn dispatch(&self, container_id: &str, ctx: &OperationContext) -> ApiResult<Container> {
        run_immediate(&self.conn, "dispatch", |tx| {
            let mut container = ContainerRepository::get_with(tx, container_id)?;
            let shipment = ShipmentRepository::get_with(tx, &container.shipment_id)?;
            lifecycle::ensure_dispatchable(&shipment, &container)?;

            ContainerRepository::update_status_with(tx, container_id, ContainerStatus::InTransit)?;
            container.status = ContainerStatus::InTransit;

            log_action(
                tx,
                ActionLog::new(ActionType::Dispatch, &ctx.actor, ctx.at)
                    .with_shipment(&shipment.shipment_id)
                    .with_container(container_id),
            )?;
            Ok(container)
        })
    }

    /// 交付: IN_TRANSIT -> DELIVERED
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor))]
    pub fn deliver(&self, container_id: &str, ctx: &OperationContext) -> ApiResult<Container> {
        run_immediate(&self.conn, "deliver", |tx| {
            let mut container = ContainerRepository::get_with(tx, container_id)?;
            lifecycle::container_transition(&container, ContainerStatus::Delivered)?;

            ContainerRepository::update_status_with(tx, container_id, ContainerStatus::Delivered)?;
            container.status = ContainerStatus::Delivered;

            log_action(
                tx,
                ActionLog::new(ActionType::Deliver, &ctx.actor, ctx.at)
                    .with_shipment(&container.shipment_id)
                    .with_container(container_id),
            )?;
            Ok(container)
        })
    }
}
