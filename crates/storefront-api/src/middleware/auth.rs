//! 认证与管理员权限中间件
//!
//! `require_user` 校验 Bearer Token 并把 [`AuthUser`] 注入请求扩展；
//! `require_admin` 必须位于其后，按 profiles.is_admin 判定管理员。

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// 从 Authorization 头提取 Bearer Token
fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 登录校验中间件
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.jwt.verify(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 管理员校验中间件
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>().cloned() else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.accounts.get_profile(user.id).await {
        Ok(Some(profile)) if profile.is_admin => next.run(request).await,
        Ok(_) => {
            warn!(user_id = %user.id, path = %request.uri().path(), "非管理员访问管理接口");
            ApiError::Forbidden("需要管理员权限".to_string()).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
