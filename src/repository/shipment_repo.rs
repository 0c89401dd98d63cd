// ==========================================
// 集装箱配载引擎 - 出运单数据仓储
// ==========================================
// 范围: shipment / shipment_commitment / shipment_line
// 红线: Repository 不做状态判定,状态转移由 LifecycleApi 事先校验
// ==========================================

use crate::domain::shipment::{Shipment, ShipmentLine};
use crate::domain::types::{FulfillmentStatus, ShipmentStatus};
use crate::repository::convert::{format_ts, parse_enum, parse_opt_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 出运单
    // ==========================================

    pub fn insert_with(conn: &Connection, shipment: &Shipment) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO shipment (
                shipment_id, shipment_number, status, created_by, created_at,
                confirmed_by, confirmed_at, cancelled_at, cancel_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                shipment.shipment_id,
                shipment.shipment_number,
                shipment.status.to_db_str(),
                shipment.created_by,
                format_ts(&shipment.created_at),
                shipment.confirmed_by,
                shipment.confirmed_at.as_ref().map(format_ts),
                shipment.cancelled_at.as_ref().map(format_ts),
                shipment.cancel_reason,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, shipment_id)
    }

    pub fn find_by_id_with(conn: &Connection, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let found = conn
            .query_row(
                r#"
                SELECT shipment_id, shipment_number, status, created_by, created_at,
                       confirmed_by, confirmed_at, cancelled_at, cancel_reason
                FROM shipment WHERE shipment_id = ?1
                "#,
                params![shipment_id],
                map_shipment,
            )
            .optional()?;
        Ok(found)
    }

    /// 读取出运单,不存在即报 NotFound
    pub fn get_with(conn: &Connection, shipment_id: &str) -> RepositoryResult<Shipment> {
        Self::find_by_id_with(conn, shipment_id)?
            .ok_or_else(|| RepositoryError::not_found("Shipment", shipment_id))
    }

    pub fn update_status_with(
        conn: &Connection,
        shipment_id: &str,
        status: ShipmentStatus,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE shipment SET status = ?2 WHERE shipment_id = ?1",
            params![shipment_id, status.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Shipment", shipment_id));
        }
        Ok(())
    }

    pub fn mark_confirmed_with(
        conn: &Connection,
        shipment_id: &str,
        actor: &str,
        at: &NaiveDateTime,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE shipment
            SET status = ?2, confirmed_by = ?3, confirmed_at = ?4
            WHERE shipment_id = ?1
            "#,
            params![
                shipment_id,
                ShipmentStatus::Confirmed.to_db_str(),
                actor,
                format_ts(at)
            ],
        )?;
        Ok(())
    }

    pub fn mark_cancelled_with(
        conn: &Connection,
        shipment_id: &str,
        reason: &str,
        at: &NaiveDateTime,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE shipment
            SET status = ?2, cancel_reason = ?3, cancelled_at = ?4
            WHERE shipment_id = ?1
            "#,
            params![
                shipment_id,
                ShipmentStatus::Cancelled.to_db_str(),
                reason,
                format_ts(at)
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 承诺单关联
    // ==========================================

    /// 关联承诺单（重复关联幂等）
    pub fn link_commitment_with(
        conn: &Connection,
        shipment_id: &str,
        commitment_id: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO shipment_commitment (shipment_id, commitment_id) VALUES (?1, ?2)",
            params![shipment_id, commitment_id],
        )?;
        Ok(rows == 1)
    }

    pub fn is_commitment_linked_with(
        conn: &Connection,
        shipment_id: &str,
        commitment_id: &str,
    ) -> RepositoryResult<bool> {
        let linked = conn
            .query_row(
                "SELECT 1 FROM shipment_commitment WHERE shipment_id = ?1 AND commitment_id = ?2",
                params![shipment_id, commitment_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(linked)
    }

    pub fn list_commitments(&self, shipment_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT commitment_id FROM shipment_commitment WHERE shipment_id = ?1 ORDER BY commitment_id",
        )?;
        let rows = stmt
            .query_map(params![shipment_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 行项目履约记录
    // ==========================================

    pub fn upsert_line_with(conn: &Connection, line: &ShipmentLine) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO shipment_line (shipment_id, source_line_id, quantity_planned, status)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(shipment_id, source_line_id) DO UPDATE SET
                quantity_planned = excluded.quantity_planned,
                status = excluded.status
            "#,
            params![
                line.shipment_id,
                line.source_line_id,
                line.quantity_planned,
                line.status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    pub fn list_lines(&self, shipment_id: &str) -> RepositoryResult<Vec<ShipmentLine>> {
        let conn = self.get_conn()?;
        Self::list_lines_with(&conn, shipment_id)
    }

    pub fn list_lines_with(conn: &Connection, shipment_id: &str) -> RepositoryResult<Vec<ShipmentLine>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT shipment_id, source_line_id, quantity_planned, status
            FROM shipment_line WHERE shipment_id = ?1
            ORDER BY source_line_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![shipment_id], |row| {
                let status: String = row.get(3)?;
                Ok(ShipmentLine {
                    shipment_id: row.get(0)?,
                    source_line_id: row.get(1)?,
                    quantity_planned: row.get(2)?,
                    status: parse_enum(3, &status, FulfillmentStatus::parse)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_line_status_with(
        conn: &Connection,
        shipment_id: &str,
        source_line_id: &str,
        status: FulfillmentStatus,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE shipment_line SET status = ?3
            WHERE shipment_id = ?1 AND source_line_id = ?2
            "#,
            params![shipment_id, source_line_id, status.to_db_str()],
        )?;
        Ok(())
    }
}

fn map_shipment(row: &Row) -> rusqlite::Result<Shipment> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(Shipment {
        shipment_id: row.get(0)?,
        shipment_number: row.get(1)?,
        status: parse_enum(2, &status, ShipmentStatus::parse)?,
        created_by: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
        confirmed_by: row.get(5)?,
        confirmed_at: parse_opt_ts(6, row.get(6)?)?,
        cancelled_at: parse_opt_ts(7, row.get(7)?)?,
        cancel_reason: row.get(8)?,
    })
}
