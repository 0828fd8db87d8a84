//! 支付渠道
//!
//! - `gateway`: 渠道接口与准备/确认结果
//! - `gateways`: PortOne、PayPal、Dodo、无账户转账
//! - `registry`: 按配置注册的渠道表
//! - `webhook`: Standard Webhooks 签名校验

pub mod gateway;
pub mod gateways;
mod http;
pub mod registry;
pub mod webhook;

pub use gateway::{
    ConfirmPayment, PaymentConfirmation, PaymentGateway, PrepareContext, PreparedPayment,
};
pub use http::build_http_client;
pub use registry::GatewayRegistry;
pub use webhook::{WebhookHeaders, WebhookVerifier};

#[cfg(test)]
pub use gateway::MockPaymentGateway;
