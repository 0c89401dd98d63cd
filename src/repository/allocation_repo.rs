// ==========================================
// 集装箱配载引擎 - 配载记录数据仓储
// ==========================================
// 红线: 记录的增删必须与 source_line.quantity_shipped 调整处于同一事务
// 红线: 记录创建后数量与快照不可修改,只能删除重建
// ==========================================

use crate::domain::allocation::AllocationRecord;
use crate::domain::types::AllocationStatus;
use crate::repository::convert::{format_ts, parse_enum, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT record_id, container_id, shipment_id, source_line_id, quantity,
           unit_weight_kg, total_weight_kg, unit_volume_cbm, total_volume_cbm,
           unit_price, customs_value, shipment_sequence, unit_ref, status,
           created_by, created_at
    FROM allocation_record
"#;

pub struct AllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作（均在调用方事务内执行）
    // ==========================================

    pub fn insert_with(conn: &Connection, record: &AllocationRecord) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO allocation_record (
                record_id, container_id, shipment_id, source_line_id, quantity,
                unit_weight_kg, total_weight_kg, unit_volume_cbm, total_volume_cbm,
                unit_price, customs_value, shipment_sequence, unit_ref, status,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                record.record_id,
                record.container_id,
                record.shipment_id,
                record.source_line_id,
                record.quantity,
                record.unit_weight_kg,
                record.total_weight_kg,
                record.unit_volume_cbm,
                record.total_volume_cbm,
                record.unit_price,
                record.customs_value,
                record.shipment_sequence,
                record.unit_ref,
                record.status.to_db_str(),
                record.created_by,
                format_ts(&record.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn delete_with(conn: &Connection, record_id: &str) -> RepositoryResult<()> {
        conn.execute(
            "DELETE FROM allocation_record WHERE record_id = ?1",
            params![record_id],
        )?;
        Ok(())
    }

    /// 删除实箱下全部记录,返回删除条数
    pub fn delete_by_container_with(conn: &Connection, container_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM allocation_record WHERE container_id = ?1",
            params![container_id],
        )?;
        Ok(rows)
    }

    /// 实箱下 DRAFT 记录 -> PACKED,返回更新条数
    pub fn mark_packed_by_container_with(conn: &Connection, container_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE allocation_record SET status = ?2
            WHERE container_id = ?1 AND status = ?3
            "#,
            params![
                container_id,
                AllocationStatus::Packed.to_db_str(),
                AllocationStatus::Draft.to_db_str(),
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id_with(conn: &Connection, record_id: &str) -> RepositoryResult<Option<AllocationRecord>> {
        let sql = format!("{} WHERE record_id = ?1", SELECT_COLUMNS);
        let found = conn.query_row(&sql, params![record_id], map_row).optional()?;
        Ok(found)
    }

    pub fn get_with(conn: &Connection, record_id: &str) -> RepositoryResult<AllocationRecord> {
        Self::find_by_id_with(conn, record_id)?
            .ok_or_else(|| RepositoryError::not_found("AllocationRecord", record_id))
    }

    pub fn list_by_container(&self, container_id: &str) -> RepositoryResult<Vec<AllocationRecord>> {
        let conn = self.get_conn()?;
        Self::list_by_container_with(&conn, container_id)
    }

    pub fn list_by_container_with(
        conn: &Connection,
        container_id: &str,
    ) -> RepositoryResult<Vec<AllocationRecord>> {
        let sql = format!(
            "{} WHERE container_id = ?1 ORDER BY created_at, record_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![container_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<AllocationRecord>> {
        let conn = self.get_conn()?;
        Self::list_by_shipment_with(&conn, shipment_id)
    }

    pub fn list_by_shipment_with(
        conn: &Connection,
        shipment_id: &str,
    ) -> RepositoryResult<Vec<AllocationRecord>> {
        let sql = format!(
            "{} WHERE shipment_id = ?1 ORDER BY container_id, created_at, record_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![shipment_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 本出运单对该承诺行已取得的分批序号（无记录返回 None）
    pub fn sequence_for_with(
        conn: &Connection,
        shipment_id: &str,
        source_line_id: &str,
    ) -> RepositoryResult<Option<i64>> {
        let seq = conn
            .query_row(
                r#"
                SELECT shipment_sequence FROM allocation_record
                WHERE shipment_id = ?1 AND source_line_id = ?2
                LIMIT 1
                "#,
                params![shipment_id, source_line_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(seq)
    }

    /// 出运单内按承诺行汇总已配载数量
    pub fn sum_by_line_for_shipment_with(
        conn: &Connection,
        shipment_id: &str,
    ) -> RepositoryResult<Vec<(String, i64)>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT source_line_id, SUM(quantity)
            FROM allocation_record
            WHERE shipment_id = ?1
            GROUP BY source_line_id
            ORDER BY source_line_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![shipment_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 承诺行全部存活记录的数量之和（应恒等于 quantity_shipped）
    pub fn sum_for_line_with(conn: &Connection, source_line_id: &str) -> RepositoryResult<i64> {
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM allocation_record WHERE source_line_id = ?1",
            params![source_line_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<AllocationRecord> {
    let status: String = row.get(13)?;
    let created_at: String = row.get(15)?;
    Ok(AllocationRecord {
        record_id: row.get(0)?,
        container_id: row.get(1)?,
        shipment_id: row.get(2)?,
        source_line_id: row.get(3)?,
        quantity: row.get(4)?,
        unit_weight_kg: row.get(5)?,
        total_weight_kg: row.get(6)?,
        unit_volume_cbm: row.get(7)?,
        total_volume_cbm: row.get(8)?,
        unit_price: row.get(9)?,
        customs_value: row.get(10)?,
        shipment_sequence: row.get(11)?,
        unit_ref: row.get(12)?,
        status: parse_enum(13, &status, AllocationStatus::parse)?,
        created_by: row.get(14)?,
        created_at: parse_ts(15, &created_at)?,
    })
}
