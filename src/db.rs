// ==========================================
// 集装箱配载引擎 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供幂等的 init_schema,测试与开发工具共用同一份表结构
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CONTAINER_LOADING_DB_PATH";

const DB_FILE_NAME: &str = "container_loading.db";

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置; 两个连接并发 BEGIN IMMEDIATE 时后到者在此等待
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径
///
/// 优先级: 环境变量 CONTAINER_LOADING_DB_PATH > 用户数据目录 > 当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("container-loading");
            // 目录创建失败时退回当前目录
            if std::fs::create_dir_all(&dir).is_ok() {
                return dir.join(DB_FILE_NAME).to_string_lossy().to_string();
            }
            format!("./{}", DB_FILE_NAME)
        }
        None => format!("./{}", DB_FILE_NAME),
    }
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- 箱型目录（只读）
CREATE TABLE IF NOT EXISTS container_type (
    code TEXT PRIMARY KEY,
    name TEXT,
    capacity_cbm REAL NOT NULL CHECK (capacity_cbm >= 0),
    max_gross_weight REAL NOT NULL CHECK (max_gross_weight >= 0),
    estimated_cost REAL,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- 包装箱型目录（只读）
CREATE TABLE IF NOT EXISTS packing_box_type (
    code TEXT PRIMARY KEY,
    name TEXT,
    length_cm REAL NOT NULL,
    width_cm REAL NOT NULL,
    height_cm REAL NOT NULL,
    max_weight_kg REAL NOT NULL,
    max_volume_cbm REAL NOT NULL,
    unit_cost REAL,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- 销售承诺行
CREATE TABLE IF NOT EXISTS source_line (
    source_line_id TEXT PRIMARY KEY,
    commitment_id TEXT NOT NULL,
    product_code TEXT,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    quantity_shipped INTEGER NOT NULL DEFAULT 0 CHECK (quantity_shipped >= 0),
    unit_weight_kg REAL NOT NULL DEFAULT 0,
    unit_volume_cbm REAL NOT NULL DEFAULT 0,
    unit_price REAL NOT NULL DEFAULT 0,
    shipment_count INTEGER NOT NULL DEFAULT 0,
    revision INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_source_line_commitment ON source_line(commitment_id);

CREATE TABLE IF NOT EXISTS shipment (
    shipment_id TEXT PRIMARY KEY,
    shipment_number TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    confirmed_by TEXT,
    confirmed_at TEXT,
    cancelled_at TEXT,
    cancel_reason TEXT
);

-- 出运单关联的承诺单
CREATE TABLE IF NOT EXISTS shipment_commitment (
    shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
    commitment_id TEXT NOT NULL,
    PRIMARY KEY (shipment_id, commitment_id)
);

-- 出运单行项目履约记录
CREATE TABLE IF NOT EXISTS shipment_line (
    shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
    source_line_id TEXT NOT NULL REFERENCES source_line(source_line_id),
    quantity_planned INTEGER NOT NULL CHECK (quantity_planned >= 0),
    status TEXT NOT NULL DEFAULT 'PENDING',
    PRIMARY KEY (shipment_id, source_line_id)
);

CREATE TABLE IF NOT EXISTS container (
    container_id TEXT PRIMARY KEY,
    shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
    container_number TEXT NOT NULL UNIQUE,
    type_code TEXT NOT NULL REFERENCES container_type(code),
    status TEXT NOT NULL,
    seal_number TEXT UNIQUE,
    sealed_at TEXT,
    sealed_by TEXT,
    current_weight REAL NOT NULL DEFAULT 0,
    current_volume REAL NOT NULL DEFAULT 0,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_container_shipment ON container(shipment_id);

CREATE TABLE IF NOT EXISTS allocation_record (
    record_id TEXT PRIMARY KEY,
    container_id TEXT NOT NULL REFERENCES container(container_id),
    shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
    source_line_id TEXT NOT NULL REFERENCES source_line(source_line_id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_weight_kg REAL NOT NULL,
    total_weight_kg REAL NOT NULL,
    unit_volume_cbm REAL NOT NULL,
    total_volume_cbm REAL NOT NULL,
    unit_price REAL NOT NULL,
    customs_value REAL NOT NULL,
    shipment_sequence INTEGER NOT NULL,
    unit_ref TEXT,
    status TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_allocation_container ON allocation_record(container_id);
CREATE INDEX IF NOT EXISTS idx_allocation_line ON allocation_record(source_line_id);
CREATE INDEX IF NOT EXISTS idx_allocation_shipment ON allocation_record(shipment_id);

-- 操作日志（不设外键: 被取消的实箱会被删除,日志保留）
CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    shipment_id TEXT,
    container_id TEXT,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_shipment ON action_log(shipment_id);
"#;
