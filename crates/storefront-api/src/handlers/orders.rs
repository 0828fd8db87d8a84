//! 订单 API
//!
//! 下单后由前端按 `POST /api/orders/{id}/payment` 的返回值发起支付

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::Order;
use commerce::payment::PreparedPayment;
use commerce::service::OrderDetailDto;
use tracing::info;
use validator::Validate;

use super::{JsonBody, PathId, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{ApiResponse, CreateOrderRequest, PageQuery, PageResponse};
use crate::error::Result;
use crate::state::AppState;

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetailDto>>> {
    req.validate()?;
    let selection = req.selection.selection()?;
    let currency = req.selection.currency()?;

    let detail = state
        .checkout
        .create_order(user.id, &selection, req.payment_method, currency)
        .await?;

    info!(
        user_id = %user.id,
        order_id = %detail.order.id,
        order_number = %detail.order.order_number,
        method = req.payment_method.as_str(),
        "订单已创建"
    );
    Ok(Json(ApiResponse::success_with_message(detail, "订单已创建")))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = state
        .orders
        .list_user_orders(user.id, query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(order_id), _): PathId,
) -> Result<Json<ApiResponse<OrderDetailDto>>> {
    let detail = state.orders.order_detail(user.id, order_id, false).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/orders/{id}/cancel
///
/// 只能取消自己的待支付订单
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(order_id), _): PathId,
) -> Result<Json<ApiResponse<OrderDetailDto>>> {
    state.checkout.cancel_order(user.id, order_id).await?;
    info!(user_id = %user.id, order_id = %order_id, "用户取消订单");

    let detail = state.orders.order_detail(user.id, order_id, false).await?;
    Ok(Json(ApiResponse::success_with_message(detail, "订单已取消")))
}

/// POST /api/orders/{id}/payment
///
/// 生成前端发起支付所需的参数
pub async fn prepare_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(order_id), _): PathId,
) -> Result<Json<ApiResponse<PreparedPayment>>> {
    let prepared = state
        .checkout
        .prepare_payment(user.id, order_id, user.email.clone())
        .await?;
    Ok(Json(ApiResponse::success(prepared)))
}
