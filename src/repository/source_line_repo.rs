// ==========================================
// 集装箱配载引擎 - 承诺行数据仓储
// ==========================================
// 红线: quantity_shipped 只能在持有写锁的事务内通过 apply_shipped_delta_with 变更
// 红线: 变更后 quantity_shipped 不得为负; 增加时不得超过 quantity
// 红线: 承诺量修订不得低于 quantity_shipped
// ==========================================

use crate::domain::allocation::SourceLine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT source_line_id, commitment_id, product_code, quantity, quantity_shipped,
           unit_weight_kg, unit_volume_cbm, unit_price, shipment_count, revision
    FROM source_line
"#;

pub struct SourceLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SourceLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 登记承诺行（外部承诺单审批后写入）
    pub fn insert(&self, line: &SourceLine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO source_line (
                source_line_id, commitment_id, product_code, quantity, quantity_shipped,
                unit_weight_kg, unit_volume_cbm, unit_price, shipment_count, revision
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                line.source_line_id,
                line.commitment_id,
                line.product_code,
                line.quantity,
                line.quantity_shipped,
                line.unit_weight_kg,
                line.unit_volume_cbm,
                line.unit_price,
                line.shipment_count,
                line.revision,
            ],
        )?;
        Ok(())
    }

    /// 调整已配载数量并递增 revision
    ///
    /// # 返回
    /// - Ok(true): 已更新
    /// - Ok(false): 调整后越界,未更新
    pub fn apply_shipped_delta_with(
        conn: &Connection,
        source_line_id: &str,
        delta: i64,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE source_line
            SET quantity_shipped = quantity_shipped + ?2,
                revision = revision + 1
            WHERE source_line_id = ?1
              AND quantity_shipped + ?2 >= 0
              AND (?2 <= 0 OR quantity_shipped + ?2 <= quantity)
            "#,
            params![source_line_id, delta],
        )?;
        Ok(rows == 1)
    }

    /// 承诺量变更（承诺单修订）,revision +1
    ///
    /// 新承诺量不得低于已配载量, 否则返回 FieldValueError 且行不变
    pub fn amend_quantity_with(
        conn: &Connection,
        source_line_id: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE source_line SET quantity = ?2, revision = revision + 1
            WHERE source_line_id = ?1 AND quantity_shipped <= ?2
            "#,
            params![source_line_id, quantity],
        )?;
        if rows == 0 {
            let line = Self::get_with(conn, source_line_id)?;
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!(
                    "承诺量 {} 低于已配载量 {}",
                    quantity, line.quantity_shipped
                ),
            });
        }
        Ok(())
    }

    /// 分批计数器 +1,返回新值
    pub fn next_shipment_sequence_with(
        conn: &Connection,
        source_line_id: &str,
    ) -> RepositoryResult<i64> {
        let rows = conn.execute(
            "UPDATE source_line SET shipment_count = shipment_count + 1 WHERE source_line_id = ?1",
            params![source_line_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("SourceLine", source_line_id));
        }
        let count: i64 = conn.query_row(
            "SELECT shipment_count FROM source_line WHERE source_line_id = ?1",
            params![source_line_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, source_line_id: &str) -> RepositoryResult<Option<SourceLine>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, source_line_id)
    }

    pub fn find_by_id_with(
        conn: &Connection,
        source_line_id: &str,
    ) -> RepositoryResult<Option<SourceLine>> {
        let sql = format!("{} WHERE source_line_id = ?1", SELECT_COLUMNS);
        let found = conn
            .query_row(&sql, params![source_line_id], map_row)
            .optional()?;
        Ok(found)
    }

    pub fn get_with(conn: &Connection, source_line_id: &str) -> RepositoryResult<SourceLine> {
        Self::find_by_id_with(conn, source_line_id)?
            .ok_or_else(|| RepositoryError::not_found("SourceLine", source_line_id))
    }
}

fn map_row(row: &Row) -> rusqlite::Result<SourceLine> {
    Ok(SourceLine {
        source_line_id: row.get(0)?,
        commitment_id: row.get(1)?,
        product_code: row.get(2)?,
        quantity: row.get(3)?,
        quantity_shipped: row.get(4)?,
        unit_weight_kg: row.get(5)?,
        unit_volume_cbm: row.get(6)?,
        unit_price: row.get(7)?,
        shipment_count: row.get(8)?,
        revision: row.get(9)?,
    })
}
