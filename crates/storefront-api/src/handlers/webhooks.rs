//! 支付渠道 webhook（Standard Webhooks 签名）
//!
//! 签名必须基于原始请求体校验，因此直接读取 `Bytes`。
//! 已受理的事件（含重复、忽略、拒绝）一律 200；可重试错误返回 5xx 让渠道重投。

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use commerce::service::WebhookOutcome;
use commerce::{CommerceError, PaymentProvider, WebhookHeaders};
use tracing::{info, warn};

use crate::dto::{ApiResponse, WebhookAckDto};
use crate::error::{ApiError, Result};
use crate::state::AppState;

const HEADER_ID: &str = "webhook-id";
const HEADER_TIMESTAMP: &str = "webhook-timestamp";
const HEADER_SIGNATURE: &str = "webhook-signature";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ApiError::Commerce(CommerceError::InvalidSignature(format!("缺少请求头 {}", name)))
        })
}

async fn receive(
    state: &AppState,
    provider: PaymentProvider,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<ApiResponse<WebhookAckDto>>> {
    let signed = WebhookHeaders {
        id: header(headers, HEADER_ID)?,
        timestamp: header(headers, HEADER_TIMESTAMP)?,
        signature: header(headers, HEADER_SIGNATURE)?,
    };

    let outcome = state.webhooks.handle(provider, &signed, body).await?;
    match &outcome {
        WebhookOutcome::Rejected(reason) => {
            warn!(provider = provider.as_str(), event_id = signed.id, reason = %reason, "webhook 事件被拒绝");
        }
        other => {
            info!(provider = provider.as_str(), event_id = signed.id, result = other.as_str(), "webhook 已受理");
        }
    }

    Ok(Json(ApiResponse::success(WebhookAckDto {
        received: true,
        result: outcome.as_str(),
    })))
}

/// POST /api/webhooks/dodo
pub async fn dodo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAckDto>>> {
    receive(&state, PaymentProvider::Dodo, &headers, &body).await
}

/// POST /api/webhooks/portone
pub async fn portone_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAckDto>>> {
    receive(&state, PaymentProvider::PortOne, &headers, &body).await
}
