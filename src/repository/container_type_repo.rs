// ==========================================
// 集装箱配载引擎 - 箱型目录数据仓储
// ==========================================
// 红线: 引擎只读箱型; insert/upsert 仅供目录维护与测试播种
// ==========================================

use crate::domain::container::ContainerType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct ContainerTypeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContainerTypeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖箱型
    pub fn upsert(&self, container_type: &ContainerType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO container_type (code, name, capacity_cbm, max_gross_weight, estimated_cost, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                capacity_cbm = excluded.capacity_cbm,
                max_gross_weight = excluded.max_gross_weight,
                estimated_cost = excluded.estimated_cost,
                is_active = excluded.is_active
            "#,
            params![
                container_type.code,
                container_type.name,
                container_type.capacity_cbm,
                container_type.max_gross_weight,
                container_type.estimated_cost,
                container_type.is_active,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ContainerType>> {
        let conn = self.get_conn()?;
        Self::find_by_code_with(&conn, code)
    }

    pub fn find_by_code_with(conn: &Connection, code: &str) -> RepositoryResult<Option<ContainerType>> {
        let found = conn
            .query_row(
                r#"
                SELECT code, name, capacity_cbm, max_gross_weight, estimated_cost, is_active
                FROM container_type WHERE code = ?1
                "#,
                params![code],
                map_row,
            )
            .optional()?;
        Ok(found)
    }

    /// 启用箱型,按容积升序
    pub fn list_active(&self) -> RepositoryResult<Vec<ContainerType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, name, capacity_cbm, max_gross_weight, estimated_cost, is_active
            FROM container_type WHERE is_active = 1
            ORDER BY capacity_cbm ASC, code ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<ContainerType> {
    Ok(ContainerType {
        code: row.get(0)?,
        name: row.get(1)?,
        capacity_cbm: row.get(2)?,
        max_gross_weight: row.get(3)?,
        estimated_cost: row.get(4)?,
        is_active: row.get(5)?,
    })
}
