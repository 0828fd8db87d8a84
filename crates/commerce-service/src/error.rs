//! 商店服务错误类型
//!
//! 定义结算、支付、履约各环节的业务错误和系统错误

use sheet_shared::error::InfraError;
use thiserror::Error;
use uuid::Uuid;

/// 商店服务错误类型
#[derive(Debug, Error)]
pub enum CommerceError {
    // === 目录 ===
    #[error("乐谱不存在: {0}")]
    SheetNotFound(Uuid),

    #[error("合集不存在: {0}")]
    CollectionNotFound(Uuid),

    // === 订单 ===
    #[error("订单不存在: {0}")]
    OrderNotFound(Uuid),

    #[error("无权访问该订单: {0}")]
    OrderForbidden(Uuid),

    #[error("订单状态不允许此操作: order_id={order_id}, current_status={current_status}")]
    InvalidOrderStatus {
        order_id: Uuid,
        current_status: String,
    },

    #[error("订单中没有可购买的乐谱")]
    EmptyOrder,

    #[error("所选乐谱均已购买")]
    AlreadyPurchased,

    #[error("不支持的充值金额: {0}")]
    InvalidChargeAmount(i64),

    // === 账户 ===
    #[error("用户资料不存在: {0}")]
    ProfileNotFound(Uuid),

    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientCredits { required: i64, available: i64 },

    // === 支付 ===
    #[error("支付方式不可用: {method} ({currency})")]
    PaymentMethodUnavailable { method: String, currency: String },

    #[error("支付渠道未配置: {0}")]
    GatewayNotConfigured(String),

    #[error("支付金额不一致: 应付 {expected} {currency}, 实付 {actual}")]
    AmountMismatch {
        expected: i64,
        actual: i64,
        currency: String,
    },

    #[error("支付未确认: {provider} - {reason}")]
    PaymentNotConfirmed { provider: String, reason: String },

    #[error("支付渠道调用失败: {provider} (status={status:?}) - {message}")]
    Gateway {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("支付渠道请求超时: {0}")]
    GatewayTimeout(String),

    #[error("webhook 签名无效: {0}")]
    InvalidSignature(String),

    // === 下载 ===
    #[error("未购买该乐谱: {0}")]
    NotPurchased(Uuid),

    #[error("预购乐谱尚未完成: {0}")]
    PreorderNotReady(Uuid),

    #[error("文件存储服务错误: {0}")]
    Storage(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis 错误: {0}")]
    Redis(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 商店服务 Result 类型别名
pub type Result<T> = std::result::Result<T, CommerceError>;

impl CommerceError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) | Self::Redis(_) | Self::GatewayTimeout(_) => true,
            Self::Gateway { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            _ => false,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::Redis(_)
                | Self::Internal(_)
                | Self::Gateway { .. }
                | Self::GatewayTimeout(_)
                | Self::Storage(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SheetNotFound(_) => "SHEET_NOT_FOUND",
            Self::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::OrderForbidden(_) => "ORDER_FORBIDDEN",
            Self::InvalidOrderStatus { .. } => "INVALID_ORDER_STATUS",
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::AlreadyPurchased => "ALREADY_PURCHASED",
            Self::InvalidChargeAmount(_) => "INVALID_CHARGE_AMOUNT",
            Self::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::PaymentMethodUnavailable { .. } => "PAYMENT_METHOD_UNAVAILABLE",
            Self::GatewayNotConfigured(_) => "GATEWAY_NOT_CONFIGURED",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::PaymentNotConfirmed { .. } => "PAYMENT_NOT_CONFIRMED",
            Self::Gateway { .. } => "GATEWAY_ERROR",
            Self::GatewayTimeout(_) => "GATEWAY_TIMEOUT",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::NotPurchased(_) => "NOT_PURCHASED",
            Self::PreorderNotReady(_) => "PREORDER_NOT_READY",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn invalid_status(order_id: Uuid, status: &str) -> Self {
        Self::InvalidOrderStatus {
            order_id,
            current_status: status.to_string(),
        }
    }
}

impl From<InfraError> for CommerceError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Database(e) => Self::Database(e),
            InfraError::Redis(e) => Self::Redis(e.to_string()),
            InfraError::ExternalServiceTimeout { service } => Self::GatewayTimeout(service),
            InfraError::ExternalService { service, message } => Self::Gateway {
                provider: service,
                status: None,
                message,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}
