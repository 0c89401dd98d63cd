use super::core::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::convert::{parse_enum, parse_ts};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, shipment_id, container_id, action_type, action_ts,
           actor, payload_json, detail
    FROM action_log
"#;

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?1", SELECT_COLUMNS);
        let found = conn.query_row(&sql, params![action_id], map_row).optional()?;
        Ok(found)
    }

    /// 查询出运单的全部日志（按时间正序）
    pub fn list_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE shipment_id = ?1 ORDER BY action_ts ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![shipment_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询实箱的全部日志（按时间正序）
    pub fn list_by_container(&self, container_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE container_id = ?1 ORDER BY action_ts ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![container_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询最近的日志
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 统计出运单某类操作的次数
    pub fn count_by_type(&self, shipment_id: &str, action_type: ActionType) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE shipment_id = ?1 AND action_type = ?2",
            params![shipment_id, action_type.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// 将数据库行映射为 ActionLog 实体
fn map_row(row: &Row) -> SqliteResult<ActionLog> {
    let action_type: String = row.get(3)?;
    let action_ts: String = row.get(4)?;
    let payload_json: Option<String> = row.get(6)?;

    Ok(ActionLog {
        action_id: row.get(0)?,
        shipment_id: row.get(1)?,
        container_id: row.get(2)?,
        action_type: parse_enum(3, &action_type, ActionType::parse)?,
        action_ts: parse_ts(4, &action_ts)?,
        actor: row.get(5)?,
        // 损坏的 JSON 不阻断日志读取
        payload_json: payload_json.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(7)?,
    })
}
