//! 购物车 API

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::service::CartSummaryDto;
use tracing::info;

use super::{JsonBody, PathId, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{AddToCartRequest, ApiResponse, CartAddDto, CartRemoveDto, LocaleQuery};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<LocaleQuery>,
) -> Result<Json<ApiResponse<CartSummaryDto>>> {
    let summary = state.cart.cart_summary(user.id, query.currency()?).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// POST /api/cart
///
/// 已购买的乐谱返回 409，重复加入视为成功
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<AddToCartRequest>,
) -> Result<Json<ApiResponse<CartAddDto>>> {
    let added = state.cart.add_to_cart(user.id, req.sheet_id).await?;
    if added {
        info!(user_id = %user.id, sheet_id = %req.sheet_id, "加入购物车");
    }
    Ok(Json(ApiResponse::success(CartAddDto {
        sheet_id: req.sheet_id,
        added,
    })))
}

/// DELETE /api/cart/{sheetId}
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(sheet_id), _): PathId,
) -> Result<Json<ApiResponse<CartRemoveDto>>> {
    let removed = state.cart.remove_from_cart(user.id, sheet_id).await?;
    Ok(Json(ApiResponse::success(CartRemoveDto {
        removed: u64::from(removed),
    })))
}

/// DELETE /api/cart
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<CartRemoveDto>>> {
    let removed = state.cart.clear_cart(user.id).await?;
    Ok(Json(ApiResponse::success(CartRemoveDto { removed })))
}
