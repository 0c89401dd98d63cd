// ==========================================
// 集装箱配载引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 覆写顺序: 默认值 < loading/thresholds (JSON) < loading/{字段名} (单项)
// ==========================================

use crate::config::loading_profile::LoadingThresholds;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![ConfigScope::Global.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![ConfigScope::Global.scope_id(), key, value],
        )?;
        Ok(())
    }

    // ===== 配载阈值 =====

    /// 加载配载阈值
    ///
    /// 说明：
    /// - 整体 JSON 缺失或损坏时从默认值开始
    /// - 单项覆写逐项生效; 非数值的覆写记 warn 后忽略
    pub fn load_thresholds(&self) -> Result<LoadingThresholds, Box<dyn Error>> {
        let base = match self.get_global_config_value(config_keys::LOADING_THRESHOLDS)? {
            Some(raw) => serde_json::from_str::<LoadingThresholds>(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    config_key = config_keys::LOADING_THRESHOLDS,
                    error = %e,
                    "配载阈值 JSON 格式错误，使用默认值"
                );
                LoadingThresholds::default()
            }),
            None => LoadingThresholds::default(),
        };

        let mut fields = match serde_json::to_value(&base)? {
            JsonValue::Object(map) => map,
            _ => return Ok(base),
        };

        let names: Vec<String> = fields.keys().cloned().collect();
        for name in names {
            let key = config_keys::threshold_key(&name);
            let Some(raw) = self.get_global_config_value(&key)? else {
                continue;
            };
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => {
                    // consolidate_box_count 为整数字段
                    let value = if fields.get(&name).map(JsonValue::is_u64).unwrap_or(false) {
                        json!(v.round() as u64)
                    } else {
                        json!(v)
                    };
                    fields.insert(name, value);
                }
                _ => {
                    tracing::warn!(config_key = %key, raw_value = %raw, "配载阈值覆写无效，忽略");
                }
            }
        }

        Ok(serde_json::from_value(JsonValue::Object(fields))?)
    }

    /// 保存完整阈值配置（JSON）
    pub fn save_thresholds(&self, thresholds: &LoadingThresholds) -> Result<(), Box<dyn Error>> {
        let raw = serde_json::to_string(thresholds)?;
        self.set_global_config_value(config_keys::LOADING_THRESHOLDS, &raw)
    }

    // ===== 快照 =====

    /// 获取全部 global 配置的 JSON 快照
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![ConfigScope::Global.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 参数
    /// - snapshot_json: 配置快照的JSON字符串
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖同名的 global 配置,快照中没有的键保持不变
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value",
                params![ConfigScope::Global.scope_id(), key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
}

impl ConfigScope {
    pub fn scope_id(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 完整阈值配置 (JSON)
    pub const LOADING_THRESHOLDS: &str = "loading/thresholds";

    /// 单项阈值覆写键前缀
    pub const LOADING_PREFIX: &str = "loading/";

    pub const NEAR_LIMIT_PCT: &str = "loading/near_limit_pct";
    pub const UNDERUTILIZED_VOLUME_PCT: &str = "loading/underutilized_volume_pct";
    pub const IDEAL_UTILIZATION_PCT: &str = "loading/ideal_utilization_pct";

    pub fn threshold_key(field: &str) -> String {
        format!("{}{}", LOADING_PREFIX, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let cm = manager();
        assert_eq!(cm.load_thresholds().unwrap(), LoadingThresholds::default());
    }

    #[test]
    fn test_single_key_override_wins_over_json() {
        let cm = manager();
        let mut stored = LoadingThresholds::default();
        stored.near_limit_pct = 92.0;
        stored.ideal_utilization_pct = 80.0;
        cm.save_thresholds(&stored).unwrap();
        cm.set_global_config_value(config_keys::NEAR_LIMIT_PCT, "90").unwrap();
        cm.set_global_config_value("loading/consolidate_box_count", "25").unwrap();

        let loaded = cm.load_thresholds().unwrap();
        assert_eq!(loaded.near_limit_pct, 90.0);
        assert_eq!(loaded.ideal_utilization_pct, 80.0);
        assert_eq!(loaded.consolidate_box_count, 25);
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let cm = manager();
        cm.set_global_config_value(config_keys::UNDERUTILIZED_VOLUME_PCT, "abc").unwrap();
        cm.set_global_config_value(config_keys::LOADING_THRESHOLDS, "{not json").unwrap();
        let loaded = cm.load_thresholds().unwrap();
        assert_eq!(loaded.underutilized_volume_pct, 60.0);
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let cm = manager();
        cm.set_global_config_value(config_keys::NEAR_LIMIT_PCT, "93").unwrap();
        let snapshot = cm.get_config_snapshot().unwrap();

        cm.set_global_config_value(config_keys::NEAR_LIMIT_PCT, "80").unwrap();
        let restored = cm.restore_config_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            cm.get_global_config_value(config_keys::NEAR_LIMIT_PCT).unwrap().as_deref(),
            Some("93")
        );
    }
}
