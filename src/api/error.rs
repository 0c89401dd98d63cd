// ==========================================
// 集装箱配载引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为调用方可处理的分类
// 分类: 业务规则违反 / 资源未找到 / 并发冲突 / 基础设施错误
// ==========================================

use crate::domain::rules::{ConcurrencyConflict, RuleViolation};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("业务规则违反: {0}")]
    Validation(#[from] RuleViolation),

    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("并发冲突: {0}")]
    Concurrency(#[from] ConcurrencyConflict),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否为业务规则违反
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    /// 是否为并发冲突（调用方可重新读取后重试）
    pub fn is_concurrency(&self) -> bool {
        matches!(self, ApiError::Concurrency(_))
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                // 封条号兜底: 表约束触发时按业务规则返回
                if msg.contains("container.seal_number") {
                    ApiError::Validation(RuleViolation::DuplicateSealNumber {
                        seal_number: String::new(),
                    })
                } else {
                    ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
                }
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::Validation(RuleViolation::InvalidInput(format!(
                    "字段{}错误: {}",
                    field, message
                )))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_entity() {
        let err: ApiError = RepositoryError::not_found("Container", "C9").into();
        match err {
            ApiError::NotFound { entity, id } => {
                assert_eq!(entity, "Container");
                assert_eq!(id, "C9");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_seal_unique_violation_maps_to_rule() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation(
            "UNIQUE constraint failed: container.seal_number".to_string(),
        )
        .into();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::DuplicateSealNumber { .. })
        ));
    }

    #[test]
    fn test_other_unique_violation_is_database_error() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation(
            "UNIQUE constraint failed: shipment.shipment_number".to_string(),
        )
        .into();
        assert!(matches!(err, ApiError::DatabaseError(_)));
        assert!(!err.is_validation());
    }
}
