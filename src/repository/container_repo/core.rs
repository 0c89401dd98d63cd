use crate::domain::container::Container;
use crate::domain::types::ContainerStatus;
use crate::repository::convert::format_ts;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ContainerRepository - 实箱仓储
// ==========================================
pub struct ContainerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContainerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作（均在调用方事务内执行）
    // ==========================================

    pub fn insert_with(conn: &Connection, container: &Container) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO container (
                container_id, shipment_id, container_number, type_code, status,
                seal_number, sealed_at, sealed_by, current_weight, current_volume,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                container.container_id,
                container.shipment_id,
                container.container_number,
                container.type_code,
                container.status.to_db_str(),
                container.seal_number,
                container.sealed_at.as_ref().map(format_ts),
                container.sealed_by,
                container.current_weight,
                container.current_volume,
                container.created_by,
                format_ts(&container.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_status_with(
        conn: &Connection,
        container_id: &str,
        status: ContainerStatus,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE container SET status = ?2 WHERE container_id = ?1",
            params![container_id, status.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Container", container_id));
        }
        Ok(())
    }

    /// 施封: 状态 -> SEALED 并写入封条信息
    pub fn set_seal_with(
        conn: &Connection,
        container_id: &str,
        seal_number: &str,
        sealed_by: &str,
        sealed_at: &NaiveDateTime,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE container
            SET status = ?2, seal_number = ?3, sealed_by = ?4, sealed_at = ?5
            WHERE container_id = ?1
            "#,
            params![
                container_id,
                ContainerStatus::Sealed.to_db_str(),
                seal_number,
                sealed_by,
                format_ts(sealed_at),
            ],
        )?;
        Ok(())
    }

    /// 解封: 状态 -> PACKED 并清空封条信息
    pub fn clear_seal_with(conn: &Connection, container_id: &str) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE container
            SET status = ?2, seal_number = NULL, sealed_by = NULL, sealed_at = NULL
            WHERE container_id = ?1
            "#,
            params![container_id, ContainerStatus::Packed.to_db_str()],
        )?;
        Ok(())
    }

    /// 从配载记录重新汇总当前重量/体积
    pub fn refresh_totals_with(conn: &Connection, container_id: &str) -> RepositoryResult<(f64, f64)> {
        let (weight, volume): (f64, f64) = conn.query_row(
            r#"
            SELECT COALESCE(SUM(total_weight_kg), 0), COALESCE(SUM(total_volume_cbm), 0)
            FROM allocation_record WHERE container_id = ?1
            "#,
            params![container_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        conn.execute(
            "UPDATE container SET current_weight = ?2, current_volume = ?3 WHERE container_id = ?1",
            params![container_id, weight, volume],
        )?;
        Ok((weight, volume))
    }

    /// 删除实箱（调用方须先删除其配载记录）
    pub fn delete_with(conn: &Connection, container_id: &str) -> RepositoryResult<()> {
        conn.execute(
            "DELETE FROM container WHERE container_id = ?1",
            params![container_id],
        )?;
        Ok(())
    }
}
