use crate::domain::action_log::ActionLog;
use crate::repository::convert::format_ts;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志（独立写入,不与业务事务绑定）
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, log)
    }

    /// 在调用方事务内插入操作日志
    ///
    /// # 参数
    /// - `conn`: 调用方持有的连接或事务
    /// - `log`: 操作日志实体
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert_with(conn: &Connection, log: &ActionLog) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, shipment_id, container_id, action_type, action_ts,
                actor, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                log.action_id,
                log.shipment_id,
                log.container_id,
                log.action_type.to_db_str(),
                format_ts(&log.action_ts),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }
}
