//! 鼓谱商店核心服务
//!
//! 多语言鼓谱商店的商品目录、购物车、结算与支付。
//!
//! ## 核心功能
//!
//! - **目录**：分类、乐谱、合集查询，按语言区域换算展示价格
//! - **结算**：购物车、报价、下单（乐谱订单与积分充值订单）
//! - **支付**：PortOne（信用卡/카카오페이）、PayPal、Dodo、无账户转账、站内积分
//! - **订单完成**：所有支付方式共用的幂等完成流程，处理积分入账与预购
//! - **webhook**：Standard Webhooks 签名校验与事件去重
//! - **履约**：预购乐谱上传后自动完成订单，签发下载链接
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `pricing`: 币种、汇率、捆绑价分摊、充值赠送、预购预计时间
//! - `repository`: 数据库仓储层
//! - `payment`: 支付渠道适配与 webhook 签名
//! - `service`: 业务服务层
//! - `notification`: 订单邮件通知
//! - `storage`: 乐谱文件存储

pub mod error;
pub mod models;
pub mod notification;
pub mod payment;
pub mod pricing;
pub mod repository;
pub mod service;
pub mod storage;

#[cfg(test)]
mod test_fixtures;

pub use error::{CommerceError, Result};
pub use models::*;
pub use notification::{EmailNotifier, NoopNotifier, OrderNotice, OrderNotifier};
pub use payment::{GatewayRegistry, PaymentGateway, WebhookHeaders, WebhookVerifier};
pub use repository::{
    AccountRepository, CartRepository, CatalogRepository, OrderRepository,
    PaymentEventRepository, PurchaseRepository,
};
pub use storage::{SheetStorage, SupabaseStorage};
