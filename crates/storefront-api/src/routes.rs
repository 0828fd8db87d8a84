//! 路由定义
//!
//! 公开接口（目录、支付方式、webhook）、登录用户接口与管理员接口分组挂载，
//! 认证中间件以 `route_layer` 方式只作用于所在分组。

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use sheet_shared::observability::middleware as obs_middleware;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiError;
use crate::handlers::{
    admin, cart, cash, catalog, checkout, health, library, orders, payments, webhooks,
};
use crate::middleware::{require_admin, require_user, security_headers};
use crate::state::AppState;

/// 公开路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/sheets", get(catalog::list_sheets))
        .route("/sheets/{id}", get(catalog::get_sheet))
        .route("/collections", get(catalog::list_collections))
        .route("/collections/{id}", get(catalog::get_collection))
        .route("/checkout/methods", get(checkout::payment_methods))
        .route("/webhooks/dodo", post(webhooks::dodo_webhook))
        .route("/webhooks/portone", post(webhooks::portone_webhook))
}

/// 需要登录的路由
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/cart",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route("/cart/{id}", delete(cart::remove_from_cart))
        .route("/checkout/quote", post(checkout::quote))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/cancel", post(orders::cancel_order))
        .route("/orders/{id}/payment", post(orders::prepare_payment))
        .route("/payments/portone/verify", post(payments::portone_verify))
        .route("/payments/paypal/capture", post(payments::paypal_capture))
        .route("/payments/dodo/verify", post(payments::dodo_verify))
        .route("/payments/points", post(payments::pay_with_points))
        .route("/cash/charge", post(cash::charge))
        .route("/cash/balance", get(cash::balance))
        .route("/cash/transactions", get(cash::transactions))
        .route("/purchases", get(library::purchases))
        .route("/downloads/{id}", get(library::download))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

/// 管理员路由（先校验登录，再校验管理员身份）
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/confirm-deposit", post(admin::confirm_deposit))
        .route("/orders/{id}/refund", post(admin::refund_order))
        .route("/sheets/{id}/file", post(admin::attach_sheet_file))
        .route("/cash/adjust", post(admin::adjust_cash))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

/// 构建 `/api` 下的全部路由（不含前缀）
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

/// CORS 配置：`*` 放开所有来源，否则按逗号分隔的白名单
pub fn cors_layer(allowed_origins: &str, is_production: bool) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        if is_production {
            tracing::warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("接口不存在".to_string())
}

/// 组装完整应用
pub fn build_app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
