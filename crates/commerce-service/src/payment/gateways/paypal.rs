//! PayPal Orders v2
//!
//! prepare 创建 PayPal 订单（intent=CAPTURE）并返回审批链接；
//! confirm 捕获已审批的订单。访问令牌缓存到过期前一分钟。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use sheet_shared::config::PayPalConfig;
use tracing::{info, instrument};

use crate::error::{CommerceError, Result};
use crate::models::{Currency, Order, PaymentProvider};
use crate::payment::gateway::{
    ConfirmPayment, PaymentConfirmation, PaymentGateway, PrepareContext, PreparedPayment,
};
use crate::payment::http::{GatewayHttp, ensure_path_id};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const COMPLETED: &str = "COMPLETED";
const ALREADY_CAPTURED: &str = "ORDER_ALREADY_CAPTURED";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct PayPalOrder {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<PayPalLink>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PayPalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    reference_id: Option<String>,
    payments: Option<UnitPayments>,
}

#[derive(Debug, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
    status: String,
    amount: PayPalAmount,
}

#[derive(Debug, Deserialize)]
struct PayPalAmount {
    currency_code: String,
    value: String,
}

impl PayPalOrder {
    fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "payer-action" || l.rel == "approve")
            .map(|l| l.href.as_str())
    }

    fn completed_capture(&self) -> Option<(&PurchaseUnit, &Capture)> {
        self.purchase_units.iter().find_map(|unit| {
            unit.payments
                .as_ref()?
                .captures
                .iter()
                .find(|c| c.status == COMPLETED)
                .map(|c| (unit, c))
        })
    }
}

pub struct PayPalGateway {
    http: GatewayHttp,
    config: PayPalConfig,
    token: Mutex<Option<CachedToken>>,
}

impl PayPalGateway {
    pub fn new(client: reqwest::Client, config: PayPalConfig) -> Self {
        Self {
            http: GatewayHttp::new(client, PaymentProvider::PayPal),
            config,
            token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> Result<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let request = self
            .http
            .client()
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials");
        let token: TokenResponse = self.http.send_json(request).await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *self.token.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn capture(&self, paypal_order_id: &str) -> Result<(PayPalOrder, serde_json::Value)> {
        ensure_path_id("paypal_order_id", paypal_order_id)?;
        let token = self.access_token().await?;
        let request = self
            .http
            .client()
            .post(self.url(&format!("/v2/checkout/orders/{}/capture", paypal_order_id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .body("{}");

        let raw: serde_json::Value = match self.http.send_json(request).await {
            Ok(raw) => raw,
            // 重复捕获（前端重试或 webhook 先到）时查询订单现状
            Err(CommerceError::Gateway {
                status: Some(422),
                message,
                ..
            }) if message.contains(ALREADY_CAPTURED) => {
                info!(paypal_order_id, "PayPal 订单已捕获，改为查询订单");
                let url = self.url(&format!("/v2/checkout/orders/{}", paypal_order_id));
                let authorization = format!("Bearer {}", token);
                self.http
                    .get_json("paypal.get_order", |client| {
                        client.get(&url).header(AUTHORIZATION, &authorization)
                    })
                    .await?
            }
            Err(e) => return Err(e),
        };

        let order: PayPalOrder = serde_json::from_value(raw.clone())?;
        Ok((order, raw))
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PayPal
    }

    fn description(&self) -> &'static str {
        "PayPal Checkout"
    }

    #[instrument(skip(self, order, ctx), fields(order_id = %order.id))]
    async fn prepare(&self, order: &Order, ctx: &PrepareContext) -> Result<PreparedPayment> {
        let token = self.access_token().await?;
        let currency = order.display_currency;

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order.id.to_string(),
                "custom_id": order.order_number,
                "description": ctx.order_name,
                "amount": {
                    "currency_code": currency.code(),
                    "value": currency.to_decimal_string(order.display_amount),
                }
            }],
            "payment_source": {
                "paypal": {
                    "experience_context": {
                        "user_action": "PAY_NOW",
                        "shipping_preference": "NO_SHIPPING",
                        "return_url": ctx.return_url,
                        "cancel_url": ctx.cancel_url,
                    }
                }
            }
        });

        let request = self
            .http
            .client()
            .post(self.url("/v2/checkout/orders"))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header("PayPal-Request-Id", order.order_number.as_str())
            .json(&body);
        let created: PayPalOrder = self.http.send_json(request).await?;

        let redirect_url = created
            .approval_url()
            .ok_or_else(|| CommerceError::Gateway {
                provider: "paypal".into(),
                status: None,
                message: "响应中缺少审批链接".into(),
            })?
            .to_string();

        Ok(PreparedPayment::Redirect {
            provider: PaymentProvider::PayPal,
            reference: created.id,
            redirect_url,
        })
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn confirm(
        &self,
        order: &Order,
        request: &ConfirmPayment,
    ) -> Result<PaymentConfirmation> {
        if let Some(reference) = order.transaction_id.as_deref() {
            if reference != request.payment_id {
                return Err(CommerceError::PaymentNotConfirmed {
                    provider: "paypal".into(),
                    reason: "PayPal 订单号与本地订单不符".into(),
                });
            }
        }

        let (paypal_order, raw) = self.capture(&request.payment_id).await?;
        confirmation_from_order(order, &paypal_order, raw)
    }
}

fn confirmation_from_order(
    order: &Order,
    paypal_order: &PayPalOrder,
    raw: serde_json::Value,
) -> Result<PaymentConfirmation> {
    let not_confirmed = |reason: String| CommerceError::PaymentNotConfirmed {
        provider: "paypal".into(),
        reason,
    };

    if paypal_order.status != COMPLETED {
        return Err(not_confirmed(format!("订单状态为 {}", paypal_order.status)));
    }

    let (unit, capture) = paypal_order
        .completed_capture()
        .ok_or_else(|| not_confirmed("没有已完成的捕获".into()))?;

    let order_id = order.id.to_string();
    if unit.reference_id.as_deref().is_some_and(|r| r != order_id) {
        return Err(not_confirmed("reference_id 与订单不符".into()));
    }

    let currency = Currency::from_code(&capture.amount.currency_code)
        .ok_or_else(|| not_confirmed(format!("不支持的币种 {}", capture.amount.currency_code)))?;
    let paid_amount = currency
        .parse_decimal(&capture.amount.value)
        .ok_or_else(|| not_confirmed(format!("金额格式错误 {}", capture.amount.value)))?;

    Ok(PaymentConfirmation {
        provider: PaymentProvider::PayPal,
        transaction_id: capture.id.clone(),
        paid_amount,
        currency,
        raw,
    })
}
