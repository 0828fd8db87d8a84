//! PortOne V2（KG 이니시스 카드 / 카카오페이）
//!
//! 前端用浏览器 SDK 发起支付，paymentId 使用订单号；
//! 后端通过 `GET /payments/{paymentId}` 核实支付结果。

use async_trait::async_trait;
use serde::Deserialize;
use sheet_shared::config::PortOneConfig;
use tracing::{debug, instrument};

use crate::error::{CommerceError, Result};
use crate::models::{Currency, Order, PaymentMethod, PaymentProvider};
use crate::payment::gateway::{
    ConfirmPayment, PaymentConfirmation, PaymentGateway, PrepareContext, PreparedPayment,
};
use crate::payment::http::GatewayHttp;

const PAID: &str = "PAID";

/// PortOne 支付查询响应（只取用到的字段）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortOnePayment {
    id: String,
    status: String,
    transaction_id: Option<String>,
    amount: PortOneAmount,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct PortOneAmount {
    total: i64,
}

pub struct PortOneGateway {
    http: GatewayHttp,
    config: PortOneConfig,
}

impl PortOneGateway {
    pub fn new(client: reqwest::Client, config: PortOneConfig) -> Self {
        Self {
            http: GatewayHttp::new(client, PaymentProvider::PortOne),
            config,
        }
    }

    fn channel(&self, method: PaymentMethod) -> Result<(&str, &'static str)> {
        let (key, pay_method) = match method {
            PaymentMethod::Card => (self.config.card_channel_key.as_str(), "CARD"),
            PaymentMethod::KakaoPay => (self.config.kakaopay_channel_key.as_str(), "EASY_PAY"),
            other => {
                return Err(CommerceError::PaymentMethodUnavailable {
                    method: other.as_str().to_string(),
                    currency: Currency::Krw.code().to_string(),
                });
            }
        };
        if key.is_empty() {
            return Err(CommerceError::GatewayNotConfigured(format!(
                "portone:{}",
                method.as_str()
            )));
        }
        Ok((key, pay_method))
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<(PortOnePayment, serde_json::Value)> {
        let url = format!(
            "{}/payments/{}",
            self.config.api_base.trim_end_matches('/'),
            payment_id
        );
        let authorization = format!("PortOne {}", self.config.api_secret);

        let raw: serde_json::Value = self
            .http
            .get_json("portone.get_payment", |client| {
                client
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, &authorization)
            })
            .await?;
        let payment: PortOnePayment = serde_json::from_value(raw.clone())?;
        Ok((payment, raw))
    }
}

#[async_trait]
impl PaymentGateway for PortOneGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PortOne
    }

    fn description(&self) -> &'static str {
        "PortOne (KG Inicis card / KakaoPay)"
    }

    async fn prepare(&self, order: &Order, ctx: &PrepareContext) -> Result<PreparedPayment> {
        let (channel_key, pay_method) = self.channel(order.payment_method)?;

        Ok(PreparedPayment::PortoneSdk {
            store_id: self.config.store_id.clone(),
            channel_key: channel_key.to_string(),
            payment_id: order.order_number.clone(),
            order_name: ctx.order_name.clone(),
            total_amount: order.total_amount,
            currency: "CURRENCY_KRW".to_string(),
            pay_method: pay_method.to_string(),
            redirect_url: ctx.return_url.clone(),
        })
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn confirm(
        &self,
        order: &Order,
        request: &ConfirmPayment,
    ) -> Result<PaymentConfirmation> {
        if request.payment_id != order.order_number {
            return Err(CommerceError::PaymentNotConfirmed {
                provider: "portone".into(),
                reason: format!("paymentId {} 与订单号不符", request.payment_id),
            });
        }

        let (payment, raw) = self.fetch_payment(&request.payment_id).await?;
        debug!(status = %payment.status, total = payment.amount.total, "PortOne 支付查询完成");

        if payment.status != PAID {
            return Err(CommerceError::PaymentNotConfirmed {
                provider: "portone".into(),
                reason: format!("支付状态为 {}", payment.status),
            });
        }

        let currency = Currency::from_code(payment.currency.trim_start_matches("CURRENCY_"))
            .ok_or_else(|| CommerceError::PaymentNotConfirmed {
                provider: "portone".into(),
                reason: format!("不支持的币种 {}", payment.currency),
            })?;

        Ok(PaymentConfirmation {
            provider: PaymentProvider::PortOne,
            transaction_id: payment.transaction_id.unwrap_or(payment.id),
            paid_amount: payment.amount.total,
            currency,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::http::build_http_client;
    use crate::test_fixtures::sample_order;
    use crate::models::OrderType;

    fn gateway(config: PortOneConfig) -> PortOneGateway {
        PortOneGateway::new(build_http_client().unwrap(), config)
    }

    fn configured() -> PortOneConfig {
        PortOneConfig {
            api_base: "http://127.0.0.1:1".into(),
            api_secret: "secret".into(),
            store_id: "store-test".into(),
            card_channel_key: "channel-card".into(),
            kakaopay_channel_key: "channel-kakao".into(),
            webhook_secret: String::new(),
        }
    }

    fn ctx() -> PrepareContext {
        PrepareContext {
            order_name: "Hotel California".into(),
            customer_email: None,
            return_url: "https://example.com/payments/complete".into(),
            cancel_url: "https://example.com/cart".into(),
        }
    }

    #[tokio::test]
    async fn test_prepare_card_and_kakaopay() {
        let gateway = gateway(configured());
        let mut order = sample_order(OrderType::Product);
        order.payment_method = PaymentMethod::Card;

        let prepared = gateway.prepare(&order, &ctx()).await.unwrap();
        match prepared {
            PreparedPayment::PortoneSdk {
                channel_key,
                pay_method,
                payment_id,
                total_amount,
                currency,
                ..
            } => {
                assert_eq!(channel_key, "channel-card");
                assert_eq!(pay_method, "CARD");
                assert_eq!(payment_id, order.order_number);
                assert_eq!(total_amount, order.total_amount);
                assert_eq!(currency, "CURRENCY_KRW");
            }
            other => panic!("unexpected {:?}", other),
        }

        order.payment_method = PaymentMethod::KakaoPay;
        let prepared = gateway.prepare(&order, &ctx()).await.unwrap();
        assert!(matches!(
            prepared,
            PreparedPayment::PortoneSdk { ref pay_method, .. } if pay_method == "EASY_PAY"
        ));
    }

    #[tokio::test]
    async fn test_prepare_without_channel_key() {
        let mut config = configured();
        config.kakaopay_channel_key.clear();
        let gateway = gateway(config);
        let mut order = sample_order(OrderType::Product);
        order.payment_method = PaymentMethod::KakaoPay;

        let err = gateway.prepare(&order, &ctx()).await.unwrap_err();
        assert_eq!(err.error_code(), "GATEWAY_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_confirm_rejects_foreign_payment_id() {
        let gateway = gateway(configured());
        let order = sample_order(OrderType::Product);
        let err = gateway
            .confirm(&order, &ConfirmPayment::new("DS-someone-else"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PAYMENT_NOT_CONFIRMED");
    }

    #[test]
    fn test_parse_payment_response() {
        let raw = serde_json::json!({
            "status": "PAID",
            "id": "DS20261019120000123456",
            "transactionId": "0190a2f4-tx",
            "amount": {"total": 12000, "paid": 12000},
            "currency": "KRW"
        });
        let payment: PortOnePayment = serde_json::from_value(raw).unwrap();
        assert_eq!(payment.status, PAID);
        assert_eq!(payment.amount.total, 12_000);
        assert_eq!(payment.transaction_id.as_deref(), Some("0190a2f4-tx"));
    }
}
