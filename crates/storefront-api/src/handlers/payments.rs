//! 支付确认 API
//!
//! 前端在渠道回跳后调用，服务端向渠道查询实付金额后完成订单。
//! webhook 与回跳可能同时到达，订单完成流程保证只入账一次。

use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use commerce::payment::ConfirmPayment;
use commerce::service::CompletionOutcome;
use commerce::{OrderStatus, PaymentProvider};
use uuid::Uuid;
use validator::Validate;

use super::JsonBody;
use crate::auth::AuthUser;
use crate::dto::{
    ApiResponse, DodoVerifyRequest, PayPalCaptureRequest, PaymentResultDto, PointsPaymentRequest,
    PortOneVerifyRequest,
};
use crate::error::Result;
use crate::state::AppState;

pub(crate) fn payment_response(outcome: CompletionOutcome) -> Json<ApiResponse<PaymentResultDto>> {
    let result = PaymentResultDto::from(outcome);
    let message = if result.duplicate {
        "订单已支付"
    } else if result.status == OrderStatus::Processing {
        "支付成功，预购乐谱将在上传后开放下载"
    } else {
        "支付成功"
    };
    Json(ApiResponse::success_with_message(result, message))
}

async fn confirm(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    provider: PaymentProvider,
    payment_id: String,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    let outcome = state
        .payments
        .confirm_payment(user.id, order_id, provider, ConfirmPayment::new(payment_id))
        .await?;
    Ok(payment_response(outcome))
}

/// POST /api/payments/portone/verify
pub async fn portone_verify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<PortOneVerifyRequest>,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    req.validate()?;
    confirm(&state, &user, req.order_id, PaymentProvider::PortOne, req.payment_id).await
}

/// POST /api/payments/paypal/capture
pub async fn paypal_capture(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<PayPalCaptureRequest>,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    req.validate()?;
    confirm(&state, &user, req.order_id, PaymentProvider::PayPal, req.paypal_order_id).await
}

/// POST /api/payments/dodo/verify
pub async fn dodo_verify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<DodoVerifyRequest>,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    req.validate()?;
    confirm(&state, &user, req.order_id, PaymentProvider::Dodo, req.payment_id).await
}

/// POST /api/payments/points
pub async fn pay_with_points(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<PointsPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    let outcome = state.points.pay_with_points(user.id, req.order_id).await?;
    Ok(payment_response(outcome))
}
