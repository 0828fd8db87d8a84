//! 结算 API：支付方式与报价

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::OrderType;
use commerce::service::Quote;
use validator::Validate;

use super::{JsonBody, QueryParams};
use crate::auth::AuthUser;
use crate::dto::{ApiResponse, CheckoutMethodsDto, CheckoutRequest, LocaleQuery};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/checkout/methods
///
/// 只返回币种允许且渠道已配置的支付方式
pub async fn payment_methods(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<LocaleQuery>,
) -> Result<Json<ApiResponse<CheckoutMethodsDto>>> {
    let currency = query.currency()?;
    Ok(Json(ApiResponse::success(CheckoutMethodsDto {
        currency,
        product_methods: state.checkout.payment_methods(currency, OrderType::Product),
        cash_methods: state.checkout.payment_methods(currency, OrderType::Cash),
        charge_packages: state.checkout.charge_packages().to_vec(),
    })))
}

/// POST /api/checkout/quote
pub async fn quote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<CheckoutRequest>,
) -> Result<Json<ApiResponse<Quote>>> {
    req.validate()?;
    let selection = req.selection()?;
    let quote = state
        .checkout
        .quote(user.id, &selection, req.currency()?)
        .await?;
    Ok(Json(ApiResponse::success(quote)))
}
