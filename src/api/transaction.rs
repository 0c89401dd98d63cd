// ==========================================
// 集装箱配载引擎 - 写事务边界
// ==========================================
// 红线: 每个写操作 = 一个 BEGIN IMMEDIATE 事务; 任一前置条件失败即整体回滚
// 说明: IMMEDIATE 在首次读取前即取得写锁,读-判定-扣减全程串行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Mutex;

/// 在写事务内执行 `f`,成功提交,失败回滚
///
/// # 参数
/// - `operation`: 操作名,仅用于日志
pub(crate) fn run_immediate<T, F>(conn: &Mutex<Connection>, operation: &'static str, f: F) -> ApiResult<T>
where
    F: FnOnce(&Transaction<'_>) -> ApiResult<T>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;

    let tx = guard
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

    match f(&tx) {
        Ok(out) => {
            tx.commit()
                .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
            Ok(out)
        }
        Err(e) => {
            // tx drop 时自动回滚
            tracing::warn!(operation, error = %e, "写操作被拒绝,事务回滚");
            Err(e)
        }
    }
}
