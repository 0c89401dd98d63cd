// ==========================================
// 集装箱配载引擎 - 包装箱型目录数据仓储
// ==========================================

use crate::domain::packing::PackingBoxType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct PackingBoxTypeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PackingBoxTypeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, box_type: &PackingBoxType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO packing_box_type (
                code, name, length_cm, width_cm, height_cm,
                max_weight_kg, max_volume_cbm, unit_cost, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                length_cm = excluded.length_cm,
                width_cm = excluded.width_cm,
                height_cm = excluded.height_cm,
                max_weight_kg = excluded.max_weight_kg,
                max_volume_cbm = excluded.max_volume_cbm,
                unit_cost = excluded.unit_cost,
                is_active = excluded.is_active
            "#,
            params![
                box_type.code,
                box_type.name,
                box_type.length_cm,
                box_type.width_cm,
                box_type.height_cm,
                box_type.max_weight_kg,
                box_type.max_volume_cbm,
                box_type.unit_cost,
                box_type.is_active,
            ],
        )?;
        Ok(())
    }

    /// 启用箱型,按最大容积升序
    pub fn list_active(&self) -> RepositoryResult<Vec<PackingBoxType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, name, length_cm, width_cm, height_cm,
                   max_weight_kg, max_volume_cbm, unit_cost, is_active
            FROM packing_box_type WHERE is_active = 1
            ORDER BY max_volume_cbm ASC, code ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<PackingBoxType> {
    Ok(PackingBoxType {
        code: row.get(0)?,
        name: row.get(1)?,
        length_cm: row.get(2)?,
        width_cm: row.get(3)?,
        height_cm: row.get(4)?,
        max_weight_kg: row.get(5)?,
        max_volume_cbm: row.get(6)?,
        unit_cost: row.get(7)?,
        is_active: row.get(8)?,
    })
}
