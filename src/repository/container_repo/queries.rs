use super::core::ContainerRepository;
use crate::domain::container::Container;
use crate::domain::types::ContainerStatus;
use crate::repository::convert::{parse_enum, parse_opt_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT container_id, shipment_id, container_number, type_code, status,
           seal_number, sealed_at, sealed_by, current_weight, current_volume,
           created_by, created_at
    FROM container
"#;

impl ContainerRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, container_id: &str) -> RepositoryResult<Option<Container>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, container_id)
    }

    pub fn find_by_id_with(conn: &Connection, container_id: &str) -> RepositoryResult<Option<Container>> {
        let sql = format!("{} WHERE container_id = ?1", SELECT_COLUMNS);
        let found = conn
            .query_row(&sql, params![container_id], map_row)
            .optional()?;
        Ok(found)
    }

    pub fn get_with(conn: &Connection, container_id: &str) -> RepositoryResult<Container> {
        Self::find_by_id_with(conn, container_id)?
            .ok_or_else(|| RepositoryError::not_found("Container", container_id))
    }

    pub fn list_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<Container>> {
        let conn = self.get_conn()?;
        Self::list_by_shipment_with(&conn, shipment_id)
    }

    /// 出运单下实箱,按箱号排序
    pub fn list_by_shipment_with(conn: &Connection, shipment_id: &str) -> RepositoryResult<Vec<Container>> {
        let sql = format!(
            "{} WHERE shipment_id = ?1 ORDER BY container_number",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![shipment_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 封条号是否已被任一实箱使用
    pub fn seal_number_exists_with(conn: &Connection, seal_number: &str) -> RepositoryResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM container WHERE seal_number = ?1 LIMIT 1",
                params![seal_number],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    /// 出运单下已用的最大箱序号（来自箱号后缀 CNTnnn）
    pub fn max_container_seq_with(conn: &Connection, shipment_id: &str) -> RepositoryResult<i64> {
        let mut stmt = conn.prepare("SELECT container_number FROM container WHERE shipment_id = ?1")?;
        let numbers = stmt
            .query_map(params![shipment_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(numbers
            .iter()
            .filter_map(|n| n.rsplit_once("-CNT"))
            .filter_map(|(_, seq)| seq.parse::<i64>().ok())
            .max()
            .unwrap_or(0))
    }
}

fn map_row(row: &Row) -> rusqlite::Result<Container> {
    let status: String = row.get(4)?;
    let created_at: String = row.get(11)?;
    Ok(Container {
        container_id: row.get(0)?,
        shipment_id: row.get(1)?,
        container_number: row.get(2)?,
        type_code: row.get(3)?,
        status: parse_enum(4, &status, ContainerStatus::parse)?,
        seal_number: row.get(5)?,
        sealed_at: parse_opt_ts(6, row.get(6)?)?,
        sealed_by: row.get(7)?,
        current_weight: row.get(8)?,
        current_volume: row.get(9)?,
        created_by: row.get(10)?,
        created_at: parse_ts(11, &created_at)?,
    })
}
