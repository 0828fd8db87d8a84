//! 基础设施错误模块
//!
//! 定义数据库、缓存、配置、外部服务等基础设施层共享的错误类型。
//! 业务错误由各服务自行定义，并通过 `From` 转换吸收这里的错误。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum InfraError {
    // ==================== 存储错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 缓存错误 ====================
    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("缓存序列化错误: {0}")]
    CacheSerialization(String),

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 外部服务错误 ====================
    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;

impl InfraError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Redis(_) => "REDIS_ERROR",
            Self::CacheSerialization(_) => "CACHE_SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Redis(_) | Self::ExternalServiceTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = InfraError::NotFound {
            entity: "DrumSheet".to_string(),
            id: "123".to_string(),
        };
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(
            InfraError::Internal("boom".into()).code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_is_retryable() {
        let db_err = InfraError::Database(sqlx::Error::PoolTimedOut);
        assert!(db_err.is_retryable());

        let timeout = InfraError::ExternalServiceTimeout {
            service: "portone".to_string(),
        };
        assert!(timeout.is_retryable());

        let not_found = InfraError::NotFound {
            entity: "Order".to_string(),
            id: "abc".to_string(),
        };
        assert!(!not_found.is_retryable());
    }
}
