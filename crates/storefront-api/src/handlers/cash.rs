//! 积分（캐시）API：充值、余额、流水

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::CashTransaction;
use commerce::service::CashBalanceDto;
use tracing::info;
use validator::Validate;

use super::{JsonBody, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{ApiResponse, CashChargeDto, CashChargeRequest, PageQuery, PageResponse};
use crate::error::Result;
use crate::state::AppState;

/// POST /api/cash/charge
///
/// 创建充值订单并直接返回支付参数，赠送积分在支付完成时一并入账
pub async fn charge(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<CashChargeRequest>,
) -> Result<Json<ApiResponse<CashChargeDto>>> {
    req.validate()?;
    let currency = req.currency()?;

    let order = state
        .checkout
        .create_cash_order(user.id, req.amount, req.payment_method, currency)
        .await?;
    info!(
        user_id = %user.id,
        order_id = %order.id,
        amount = req.amount,
        method = req.payment_method.as_str(),
        "充值订单已创建"
    );

    let payment = state
        .checkout
        .prepare_payment(user.id, order.id, user.email.clone())
        .await?;
    Ok(Json(ApiResponse::success(CashChargeDto { order, payment })))
}

/// GET /api/cash/balance
pub async fn balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<CashBalanceDto>>> {
    let balance = state.cash.balance(user.id).await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// GET /api/cash/transactions
pub async fn transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<CashTransaction>>>> {
    let page = state
        .cash
        .ledger(user.id, query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}
