//! API 错误类型
//!
//! 业务错误按错误码映射到 HTTP 状态码；系统错误只返回通用提示，详情写日志。

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce::CommerceError;
use serde_json::json;
use sheet_shared::observability::tracing::current_trace_id;

const INTERNAL_MESSAGE: &str = "服务内部错误，请稍后重试";
const UPSTREAM_MESSAGE: &str = "支付或存储服务暂时不可用，请稍后重试";

/// API 层错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("资源不存在: {0}")]
    NotFound(String),
    #[error(transparent)]
    Commerce(#[from] CommerceError),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Commerce(err) => commerce_status(err),
        }
    }

    /// 返回错误码（API 契约的一部分）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Commerce(err) => err.error_code(),
        }
    }

    /// 返回给客户端的错误描述
    fn public_message(&self) -> String {
        match self {
            Self::Internal(e) => {
                tracing::error!(error = %e, trace_id = ?current_trace_id(), "内部错误");
                INTERNAL_MESSAGE.to_string()
            }
            Self::Commerce(err) if !err.is_business_error() => {
                let status = commerce_status(err);
                if status.is_server_error() && status != StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(
                        error = %err,
                        code = err.error_code(),
                        trace_id = ?current_trace_id(),
                        "上游服务调用失败"
                    );
                    UPSTREAM_MESSAGE.to_string()
                } else {
                    tracing::error!(
                        error = %err,
                        code = err.error_code(),
                        trace_id = ?current_trace_id(),
                        "系统错误"
                    );
                    INTERNAL_MESSAGE.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

fn commerce_status(err: &CommerceError) -> StatusCode {
    use CommerceError as E;

    match err {
        E::SheetNotFound(_)
        | E::CollectionNotFound(_)
        | E::OrderNotFound(_)
        | E::ProfileNotFound(_) => StatusCode::NOT_FOUND,

        E::OrderForbidden(_) | E::NotPurchased(_) => StatusCode::FORBIDDEN,

        E::InvalidOrderStatus { .. }
        | E::AlreadyPurchased
        | E::InsufficientCredits { .. }
        | E::AmountMismatch { .. }
        | E::PreorderNotReady(_) => StatusCode::CONFLICT,

        E::EmptyOrder
        | E::InvalidChargeAmount(_)
        | E::PaymentMethodUnavailable { .. }
        | E::Validation(_) => StatusCode::BAD_REQUEST,

        E::PaymentNotConfirmed { .. } => StatusCode::PAYMENT_REQUIRED,
        E::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
        E::GatewayNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        E::Gateway { .. } | E::Storage(_) => StatusCode::BAD_GATEWAY,
        E::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,

        E::Database(_) | E::Serialization(_) | E::Redis(_) | E::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "success": false,
            "code": self.error_code(),
            "error": self.public_message(),
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        (status, serde_json::from_slice(&bytes).expect("响应体不是合法 JSON"))
    }

    #[test]
    fn test_commerce_status_mapping() {
        let cases: Vec<(CommerceError, StatusCode, &str)> = vec![
            (CommerceError::SheetNotFound(Uuid::nil()), StatusCode::NOT_FOUND, "SHEET_NOT_FOUND"),
            (CommerceError::OrderForbidden(Uuid::nil()), StatusCode::FORBIDDEN, "ORDER_FORBIDDEN"),
            (
                CommerceError::InsufficientCredits { required: 10_000, available: 0 },
                StatusCode::CONFLICT,
                "INSUFFICIENT_CREDITS",
            ),
            (CommerceError::EmptyOrder, StatusCode::BAD_REQUEST, "EMPTY_ORDER"),
            (
                CommerceError::PaymentNotConfirmed { provider: "paypal".into(), reason: "x".into() },
                StatusCode::PAYMENT_REQUIRED,
                "PAYMENT_NOT_CONFIRMED",
            ),
            (CommerceError::InvalidSignature("bad".into()), StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
            (CommerceError::NotPurchased(Uuid::nil()), StatusCode::FORBIDDEN, "NOT_PURCHASED"),
            (CommerceError::PreorderNotReady(Uuid::nil()), StatusCode::CONFLICT, "PREORDER_NOT_READY"),
            (CommerceError::GatewayNotConfigured("dodo".into()), StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_NOT_CONFIGURED"),
            (CommerceError::GatewayTimeout("portone".into()), StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT"),
            (CommerceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status, "状态码不匹配: {code}");
            assert_eq!(api.error_code(), code);
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(ApiError::Commerce(CommerceError::AlreadyPurchased)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], "ALREADY_PURCHASED");
        assert!(!body["error"].as_str().unwrap_or_default().is_empty());
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_system_errors_hide_details() {
        let (status, body) =
            body_of(CommerceError::Redis("redis://10.0.0.1:6379 refused".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains("10.0.0.1"));
        assert_eq!(message, INTERNAL_MESSAGE);

        let (status, body) = body_of(
            CommerceError::Gateway {
                provider: "paypal".into(),
                status: Some(500),
                message: "secret upstream detail".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], UPSTREAM_MESSAGE);
    }

    #[tokio::test]
    async fn test_business_errors_keep_context() {
        let id = Uuid::new_v4();
        let (_, body) = body_of(CommerceError::OrderNotFound(id).into()).await;
        assert!(body["error"].as_str().unwrap().contains(&id.to_string()));
    }

    #[test]
    fn test_from_validation_errors() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("amount", validator::ValidationError::new("range"));
        let err: ApiError = errors.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("amount"));
    }
}
