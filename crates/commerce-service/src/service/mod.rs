//! 服务层
//!
//! 实现结算、支付、履约业务逻辑，协调仓储层、缓存与支付渠道。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `catalog_service`: 目录查询（只读，带缓存）
//! - `cart_service`: 购物车
//! - `checkout_service`: 报价、下单、支付准备
//! - `completion`: 订单完成（所有支付方式共用）
//! - `payment_service`: 前端回跳后的支付确认、转账入账确认
//! - `webhook_service`: 支付渠道 webhook
//! - `points_service`: 积分支付
//! - `cash_service`: 积分余额与流水
//! - `refund`: 管理员退款
//! - `fulfilment`: 预购乐谱交付
//! - `download_service`: 下载链接
//! - `order_query`: 订单与已购乐谱查询
//! - `expiry`: 未支付订单过期取消

pub mod cart_service;
pub mod cash_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod completion;
pub mod download_service;
pub mod dto;
pub mod expiry;
pub mod fulfilment;
pub mod order_query;
pub mod payment_service;
pub mod points_service;
pub mod refund;
pub mod webhook_service;

pub use cart_service::CartService;
pub use cash_service::CashService;
pub use catalog_service::CatalogService;
pub use checkout_service::CheckoutService;
pub use completion::{
    CompletedOrder, CompletionOutcome, CompletionRequest, CompletionService, CompletionSettings,
};
pub use download_service::DownloadService;
pub use dto::*;
pub use expiry::{ExpiryPolicy, cancel_expired_orders};
pub use fulfilment::{FulfilmentResult, FulfilmentService};
pub use order_query::OrderQueryService;
pub use payment_service::PaymentService;
pub use points_service::PointsService;
pub use refund::{RefundOutcome, RefundService};
pub use webhook_service::{WebhookOutcome, WebhookService, WebhookVerifiers};
