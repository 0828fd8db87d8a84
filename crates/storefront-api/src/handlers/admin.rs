//! 管理端 API
//!
//! 挂在 `require_admin` 之后，操作人即当前登录用户

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::service::{FulfilmentResult, RefundOutcome};
use commerce::{CashTransaction, Order};
use tracing::info;
use validator::Validate;

use super::payments::payment_response;
use super::{JsonBody, PathId, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{
    AdminOrderQuery, ApiResponse, AttachFileRequest, CashAdjustRequest, ConfirmDepositRequest,
    PageResponse, PaymentResultDto,
};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/admin/orders
pub async fn list_orders(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<AdminOrderQuery>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = state
        .orders
        .admin_list_orders(query.status, query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// POST /api/admin/orders/{id}/confirm-deposit
///
/// 确认无账户转账已到账，走与在线支付相同的订单完成流程
pub async fn confirm_deposit(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(order_id), _): PathId,
    WithRejection(Json(req), _): JsonBody<ConfirmDepositRequest>,
) -> Result<Json<ApiResponse<PaymentResultDto>>> {
    req.validate()?;
    let outcome = state
        .payments
        .confirm_bank_deposit(admin.id, order_id, req.reference)
        .await?;
    info!(admin_id = %admin.id, order_id = %order_id, "管理员确认转账入账");
    Ok(payment_response(outcome))
}

/// POST /api/admin/orders/{id}/refund
pub async fn refund_order(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(order_id), _): PathId,
) -> Result<Json<ApiResponse<RefundOutcome>>> {
    let outcome = state.refunds.refund_order(admin.id, order_id).await?;
    info!(
        admin_id = %admin.id,
        order_id = %order_id,
        credit_delta = outcome.credit_delta,
        purchases_removed = outcome.purchases_removed,
        purchases_reassigned = outcome.purchases_reassigned,
        "订单已退款"
    );
    Ok(Json(ApiResponse::success_with_message(outcome, "订单已退款")))
}

/// POST /api/admin/sheets/{id}/file
///
/// 挂载乐谱 PDF；预购乐谱会同时完成所有等待中的订单
pub async fn attach_sheet_file(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(sheet_id), _): PathId,
    WithRejection(Json(req), _): JsonBody<AttachFileRequest>,
) -> Result<Json<ApiResponse<FulfilmentResult>>> {
    req.validate()?;
    let result = state
        .fulfilment
        .attach_sheet_file(sheet_id, &req.pdf_path)
        .await?;
    info!(
        admin_id = %admin.id,
        sheet_id = %sheet_id,
        completed_orders = result.completed_count(),
        "乐谱文件已挂载"
    );
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/admin/cash/adjust
pub async fn adjust_cash(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<CashAdjustRequest>,
) -> Result<Json<ApiResponse<CashTransaction>>> {
    req.validate()?;
    let row = state
        .cash
        .admin_adjust(admin.id, req.user_id, req.amount, &req.reason)
        .await?;
    info!(
        admin_id = %admin.id,
        user_id = %req.user_id,
        amount = req.amount,
        balance_after = row.balance_after,
        "管理员调整积分"
    );
    Ok(Json(ApiResponse::success(row)))
}
