//! 支付渠道抽象
//!
//! 每个渠道负责两件事：为前端准备支付参数，以及向渠道确认一笔支付。
//! 金额与订单的核对统一在订单完成流程中进行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Currency, Order, PaymentProvider};

/// 准备支付时的上下文
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareContext {
    /// 展示给用户的订单名，如 "Hotel California 외 2건"
    pub order_name: String,
    pub customer_email: Option<String>,
    /// 支付完成后的回跳地址
    pub return_url: String,
    pub cancel_url: String,
}

/// 前端发起支付所需的参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PreparedPayment {
    /// PortOne 浏览器 SDK 参数
    PortoneSdk {
        store_id: String,
        channel_key: String,
        payment_id: String,
        order_name: String,
        total_amount: i64,
        currency: String,
        pay_method: String,
        redirect_url: String,
    },
    /// 跳转到渠道托管页面（PayPal 审批页 / Dodo 结账页）
    Redirect {
        provider: PaymentProvider,
        /// 渠道侧的订单或会话 ID
        reference: String,
        redirect_url: String,
    },
    /// 无账户转账收款信息
    BankTransfer {
        bank_name: String,
        account_number: String,
        account_holder: String,
        amount: i64,
        deposit_deadline: DateTime<Utc>,
    },
}

impl PreparedPayment {
    /// 需要先写入订单的渠道参考号
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Redirect { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// 确认支付请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPayment {
    /// PortOne paymentId / PayPal order id / Dodo payment_id / 人工确认备注号
    pub payment_id: String,
}

impl ConfirmPayment {
    pub fn new(payment_id: impl Into<String>) -> Self {
        Self {
            payment_id: payment_id.into(),
        }
    }
}

/// 渠道确认结果
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub provider: PaymentProvider,
    pub transaction_id: String,
    /// 渠道实收金额（最小单位）
    pub paid_amount: i64,
    pub currency: Currency,
    /// 渠道原始响应，便于排查
    pub raw: Value,
}

/// 支付渠道接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// 渠道名称（日志/诊断用）
    fn description(&self) -> &'static str;

    async fn prepare(&self, order: &Order, ctx: &PrepareContext) -> Result<PreparedPayment>;

    /// 向渠道查询或捕获支付；未成功时返回 `PaymentNotConfirmed`
    async fn confirm(&self, order: &Order, request: &ConfirmPayment)
    -> Result<PaymentConfirmation>;
}
