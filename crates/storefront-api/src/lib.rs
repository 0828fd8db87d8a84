//! 鼓谱商店 REST API
//!
//! 面向 Web 前端的 `/api/*` 接口：目录、购物车、结算、支付确认、积分、下载与管理端操作，
//! 以及 PortOne/Dodo 的 webhook 回调。
//!
//! ## 模块结构
//!
//! - `auth`: Supabase access token 校验
//! - `middleware`: 登录/管理员校验与安全响应头
//! - `dto`: 请求与响应结构
//! - `handlers`: 各接口处理器
//! - `routes`: 路由分组与应用组装
//! - `state`: 共享状态
//! - `worker`: 后台任务

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod worker;

pub use error::{ApiError, Result};
pub use routes::{build_app, cors_layer};
pub use state::AppState;
