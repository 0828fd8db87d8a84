//! 中间件模块
//!
//! 提供登录校验、管理员校验与安全头中间件

mod auth;
mod security;

pub use auth::{require_admin, require_user};
pub use security::security_headers;
