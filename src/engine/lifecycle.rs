// ==========================================
// 集装箱配载引擎 - 生命周期守卫规则
// ==========================================
// 职责: 集装箱/出运单状态变更与配载变更的前置条件判定（纯函数）
// 输入: 事务内读取的快照
// 红线: 只判定不落库; 落库由 LifecycleApi / LedgerApi 在同一事务内完成
// ==========================================

use crate::domain::allocation::{AllocationRecord, SourceLine};
use crate::domain::container::Container;
use crate::domain::rules::{ConcurrencyConflict, RuleViolation};
use crate::domain::shipment::Shipment;
use crate::domain::types::{AllocationStatus, ContainerStatus, FulfillmentStatus, ShipmentStatus};

/// 出运单必须处于 DRAFT / PREPARING
pub fn ensure_shipment_mutable(shipment: &Shipment) -> Result<(), RuleViolation> {
    if shipment.status.is_mutable() {
        Ok(())
    } else {
        Err(RuleViolation::ShipmentNotMutable {
            shipment_id: shipment.shipment_id.clone(),
            status: shipment.status,
        })
    }
}

/// 增删配载记录: 出运单 DRAFT/PREPARING 且集装箱 DRAFT/PACKED
pub fn ensure_allocation_mutable(
    shipment: &Shipment,
    container: &Container,
) -> Result<(), RuleViolation> {
    ensure_shipment_mutable(shipment)?;
    if container.status.is_mutable() {
        Ok(())
    } else {
        Err(RuleViolation::ContainerNotMutable {
            container_id: container.container_id.clone(),
            status: container.status,
        })
    }
}

pub fn container_transition(
    container: &Container,
    to: ContainerStatus,
) -> Result<(), RuleViolation> {
    if container.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(RuleViolation::IllegalTransition {
            entity: "container",
            from: container.status.to_string(),
            to: to.to_string(),
        })
    }
}

pub fn shipment_transition(shipment: &Shipment, to: ShipmentStatus) -> Result<(), RuleViolation> {
    if shipment.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(RuleViolation::IllegalTransition {
            entity: "shipment",
            from: shipment.status.to_string(),
            to: to.to_string(),
        })
    }
}

/// 施封前置条件
///
/// 顺序: 出运单可变 -> 至少一条记录 -> 全部已装箱 -> 状态转移合法
/// 封条号唯一性由调用方在事务内查询后判定
pub fn ensure_sealable(
    shipment: &Shipment,
    container: &Container,
    records: &[AllocationRecord],
) -> Result<(), RuleViolation> {
    ensure_shipment_mutable(shipment)?;

    if records.is_empty() {
        return Err(RuleViolation::EmptyContainer {
            container_id: container.container_id.clone(),
        });
    }

    let unpacked = records
        .iter()
        .filter(|r| r.status != AllocationStatus::Packed)
        .count();
    if unpacked > 0 {
        return Err(RuleViolation::UnpackedItems {
            container_id: container.container_id.clone(),
            count: unpacked,
        });
    }

    container_transition(container, ContainerStatus::Sealed)
}

/// 解封: 仅 SEALED 且出运单处于 PREPARING
pub fn ensure_unsealable(shipment: &Shipment, container: &Container) -> Result<(), RuleViolation> {
    if shipment.status != ShipmentStatus::Preparing {
        return Err(RuleViolation::ShipmentNotMutable {
            shipment_id: shipment.shipment_id.clone(),
            status: shipment.status,
        });
    }
    container_transition(container, ContainerStatus::Packed)
}

/// 发运: SEALED -> IN_TRANSIT, 出运单必须已确认
pub fn ensure_dispatchable(shipment: &Shipment, container: &Container) -> Result<(), RuleViolation> {
    if shipment.status != ShipmentStatus::Confirmed {
        return Err(RuleViolation::IllegalTransition {
            entity: "shipment",
            from: shipment.status.to_string(),
            to: ShipmentStatus::Confirmed.to_string(),
        });
    }
    container_transition(container, ContainerStatus::InTransit)
}

/// 确认前置条件（并发检查另见 `check_line_available`）
///
/// # 参数
/// - `unallocated_units`: 计划数量中尚未配载的合计
pub fn ensure_confirmable(
    shipment: &Shipment,
    containers: &[Container],
    unallocated_units: i64,
) -> Result<(), RuleViolation> {
    shipment_transition(shipment, ShipmentStatus::Confirmed)?;

    if containers.is_empty() {
        return Err(RuleViolation::NoContainers {
            shipment_id: shipment.shipment_id.clone(),
        });
    }

    let unsealed = containers
        .iter()
        .filter(|c| c.status != ContainerStatus::Sealed)
        .count();
    if unsealed > 0 {
        return Err(RuleViolation::UnsealedContainers {
            shipment_id: shipment.shipment_id.clone(),
            count: unsealed,
        });
    }

    if unallocated_units > 0 {
        return Err(RuleViolation::UnallocatedUnits {
            shipment_id: shipment.shipment_id.clone(),
            count: unallocated_units,
        });
    }

    Ok(())
}

/// 确认时的承诺行余量复核
///
/// 本单配载量不得超过“扣除其他出运单占用后”的剩余:
/// allocated_here <= quantity - (quantity_shipped - allocated_here)
pub fn check_line_available(
    line: &SourceLine,
    allocated_here: i64,
) -> Result<(), ConcurrencyConflict> {
    let consumed_elsewhere = line.quantity_shipped - allocated_here;
    let available = line.quantity - consumed_elsewhere;
    if allocated_here <= available {
        Ok(())
    } else {
        Err(ConcurrencyConflict::CommitmentConsumed {
            source_line_id: line.source_line_id.clone(),
            allocated_here,
            available,
        })
    }
}

/// 确认后行项目履约状态（按累计已发运 vs 承诺量）
pub fn fulfillment_status(line: &SourceLine) -> FulfillmentStatus {
    if line.quantity_shipped >= line.quantity {
        FulfillmentStatus::FullyShipped
    } else {
        FulfillmentStatus::PartialShipped
    }
}
