//! Dodo Payments
//!
//! prepare 创建托管结账会话；confirm 查询支付详情。
//! webhook 推送的 payment 对象与查询接口结构相同，共用解析与核对逻辑。

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use sheet_shared::config::DodoConfig;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{Currency, Order, PaymentProvider};
use crate::payment::gateway::{
    ConfirmPayment, PaymentConfirmation, PaymentGateway, PrepareContext, PreparedPayment,
};
use crate::payment::http::{GatewayHttp, ensure_path_id};

const SUCCEEDED: &str = "succeeded";

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    session_id: String,
    checkout_url: String,
}

/// Dodo 支付对象
#[derive(Debug, Clone, Deserialize)]
pub struct DodoPayment {
    pub payment_id: String,
    pub status: Option<String>,
    pub total_amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl DodoPayment {
    /// 元数据中携带的本地订单 ID
    pub fn order_id(&self) -> Option<Uuid> {
        self.metadata.get("order_id").and_then(|v| v.parse().ok())
    }
}

pub struct DodoGateway {
    http: GatewayHttp,
    config: DodoConfig,
}

impl DodoGateway {
    pub fn new(client: reqwest::Client, config: DodoConfig) -> Self {
        Self {
            http: GatewayHttp::new(client, PaymentProvider::Dodo),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }
}

#[async_trait]
impl PaymentGateway for DodoGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Dodo
    }

    fn description(&self) -> &'static str {
        "Dodo Payments"
    }

    #[instrument(skip(self, order, ctx), fields(order_id = %order.id))]
    async fn prepare(&self, order: &Order, ctx: &PrepareContext) -> Result<PreparedPayment> {
        let mut body = json!({
            "product_cart": [{
                "product_id": self.config.product_id,
                "quantity": 1,
                "amount": order.display_amount,
            }],
            "billing_currency": order.display_currency.code(),
            "return_url": ctx.return_url,
            "metadata": {
                "order_id": order.id.to_string(),
                "order_number": order.order_number,
            }
        });
        if let Some(email) = &ctx.customer_email {
            body["customer"] = json!({ "email": email });
        }

        let request = self
            .http
            .client()
            .post(self.url("/checkouts"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body);
        let session: CheckoutSession = self.http.send_json(request).await?;

        Ok(PreparedPayment::Redirect {
            provider: PaymentProvider::Dodo,
            reference: session.session_id,
            redirect_url: session.checkout_url,
        })
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn confirm(
        &self,
        order: &Order,
        request: &ConfirmPayment,
    ) -> Result<PaymentConfirmation> {
        ensure_path_id("payment_id", &request.payment_id)?;
        let url = self.url(&format!("/payments/{}", request.payment_id));
        let bearer = self.bearer();
        let raw: serde_json::Value = self
            .http
            .get_json("dodo.get_payment", |client| {
                client.get(&url).header(AUTHORIZATION, &bearer)
            })
            .await?;

        confirmation_from_payment(order, raw)
    }
}

/// 核对 Dodo 支付对象并转为确认结果
pub fn confirmation_from_payment(
    order: &Order,
    raw: serde_json::Value,
) -> Result<PaymentConfirmation> {
    let payment: DodoPayment = serde_json::from_value(raw.clone())?;
    let not_confirmed = |reason: String| CommerceError::PaymentNotConfirmed {
        provider: "dodo".into(),
        reason,
    };

    // webhook 中的 payment 对象可能不带 status，由事件类型决定
    if let Some(status) = payment.status.as_deref() {
        if status != SUCCEEDED {
            return Err(not_confirmed(format!("支付状态为 {}", status)));
        }
    }

    if payment.order_id() != Some(order.id) {
        return Err(not_confirmed("metadata.order_id 与订单不符".into()));
    }

    let currency = Currency::from_code(&payment.currency)
        .ok_or_else(|| not_confirmed(format!("不支持的币种 {}", payment.currency)))?;

    Ok(PaymentConfirmation {
        provider: PaymentProvider::Dodo,
        transaction_id: payment.payment_id,
        paid_amount: payment.total_amount,
        currency,
        raw,
    })
}
