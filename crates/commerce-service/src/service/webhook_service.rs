//! 支付 webhook 处理
//!
//! 校验签名 -> 解析事件 -> 去重（Redis 快速路径 + payment_events 唯一约束）
//! -> 分发 -> 标记已处理。可重试的错误向上返回，由渠道重新投递。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use sheet_shared::cache::{Cache, CacheKey};
use sheet_shared::config::PaymentsConfig;
use sheet_shared::observability::metrics;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::completion::{CompletionRequest, CompletionService};
use crate::error::{CommerceError, Result};
use crate::models::{CompletionSource, Order, PaymentProvider};
use crate::payment::gateways::dodo::confirmation_from_payment;
use crate::payment::{
    ConfirmPayment, GatewayRegistry, PaymentConfirmation, WebhookHeaders, WebhookVerifier,
};
use crate::repository::traits::EventRecord;
use crate::repository::{
    AccountRepositoryTrait, CartRepositoryTrait, OrderRepositoryTrait,
    PaymentEventRepositoryTrait,
};

const PROCESSED_MARKER_TTL: Duration = Duration::from_secs(24 * 3600);

/// 各渠道的签名校验器，未配置密钥的渠道为空
#[derive(Default)]
pub struct WebhookVerifiers {
    pub dodo: Option<WebhookVerifier>,
    pub portone: Option<WebhookVerifier>,
}

impl WebhookVerifiers {
    pub fn from_config(payments: &PaymentsConfig) -> Result<Self> {
        let build = |secret: &str| -> Result<Option<WebhookVerifier>> {
            if secret.trim().is_empty() {
                Ok(None)
            } else {
                WebhookVerifier::new(secret).map(Some)
            }
        };

        Ok(Self {
            dodo: build(&payments.dodo.webhook_secret)?,
            portone: build(&payments.portone.webhook_secret)?,
        })
    }

    fn get(&self, provider: PaymentProvider) -> Option<&WebhookVerifier> {
        match provider {
            PaymentProvider::Dodo => self.dodo.as_ref(),
            PaymentProvider::PortOne => self.portone.as_ref(),
            _ => None,
        }
    }
}

/// webhook 处理结果，均以 2xx 应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    /// 重复投递
    Duplicate,
    /// 不关心的事件类型
    Ignored,
    /// 事件无法应用到订单（订单不存在、已取消、金额不符等），已记录错误日志
    Rejected(String),
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// 事件对应的动作
#[derive(Debug, Clone, PartialEq)]
enum EventAction {
    Paid,
    Failed,
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
enum OrderRef {
    Id(Uuid),
    Number(String),
}

/// 解析后的事件
#[derive(Debug, Clone, PartialEq)]
struct ParsedEvent {
    event_type: String,
    action: EventAction,
    order_ref: Option<OrderRef>,
    /// 事件携带的支付数据
    data: Value,
}

fn parse_event(provider: PaymentProvider, payload: &Value) -> Result<ParsedEvent> {
    let event_type = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CommerceError::Validation("webhook 缺少 type 字段".into()))?
        .to_string();
    let data = payload.get("data").cloned().unwrap_or(Value::Null);

    let (action, order_ref) = match provider {
        PaymentProvider::Dodo => {
            let action = match event_type.as_str() {
                "payment.succeeded" => EventAction::Paid,
                "payment.failed" | "payment.cancelled" => EventAction::Failed,
                _ => EventAction::Ignore,
            };
            let order_ref = data
                .pointer("/metadata/order_id")
                .and_then(Value::as_str)
                .and_then(|v| v.parse().ok())
                .map(OrderRef::Id);
            (action, order_ref)
        }
        PaymentProvider::PortOne => {
            let action = match event_type.as_str() {
                "Transaction.Paid" => EventAction::Paid,
                "Transaction.Failed" | "Transaction.Cancelled" => EventAction::Failed,
                _ => EventAction::Ignore,
            };
            let order_ref = data
                .get("paymentId")
                .and_then(Value::as_str)
                .map(|v| OrderRef::Number(v.to_string()));
            (action, order_ref)
        }
        other => {
            return Err(CommerceError::Validation(format!(
                "不支持的 webhook 渠道: {}",
                other.as_str()
            )));
        }
    };

    Ok(ParsedEvent {
        event_type,
        action,
        order_ref,
        data,
    })
}

pub struct WebhookService<CartR, AccR, OR, ER>
where
    CartR: CartRepositoryTrait,
    AccR: AccountRepositoryTrait,
    OR: OrderRepositoryTrait,
    ER: PaymentEventRepositoryTrait,
{
    order_repo: Arc<OR>,
    event_repo: Arc<ER>,
    gateways: Arc<GatewayRegistry>,
    completion: Arc<CompletionService<CartR, AccR, OR>>,
    cache: Option<Arc<Cache>>,
    verifiers: WebhookVerifiers,
}

impl<CartR, AccR, OR, ER> WebhookService<CartR, AccR, OR, ER>
where
    CartR: CartRepositoryTrait,
    AccR: AccountRepositoryTrait,
    OR: OrderRepositoryTrait,
    ER: PaymentEventRepositoryTrait,
{
    pub fn new(
        order_repo: Arc<OR>,
        event_repo: Arc<ER>,
        gateways: Arc<GatewayRegistry>,
        completion: Arc<CompletionService<CartR, AccR, OR>>,
        cache: Option<Arc<Cache>>,
        verifiers: WebhookVerifiers,
    ) -> Self {
        Self {
            order_repo,
            event_repo,
            gateways,
            completion,
            cache,
            verifiers,
        }
    }

    /// 处理一次 webhook 投递
    ///
    /// 签名无效返回 `InvalidSignature`；可重试错误原样返回且事件保持未处理
    #[instrument(skip(self, headers, body), fields(provider = provider.as_str(), event_id = headers.id))]
    pub async fn handle(
        &self,
        provider: PaymentProvider,
        headers: &WebhookHeaders<'_>,
        body: &[u8],
    ) -> Result<WebhookOutcome> {
        let verifier = self.verifiers.get(provider).ok_or_else(|| {
            CommerceError::GatewayNotConfigured(format!("{}:webhook", provider.as_str()))
        })?;
        if let Err(e) = verifier.verify(headers, body, Utc::now()) {
            metrics::record_webhook_event(provider.as_str(), "invalid_signature");
            warn!(error = %e, "webhook 签名校验失败");
            return Err(e);
        }

        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| CommerceError::Validation(format!("webhook 请求体不是合法 JSON: {}", e)))?;
        let event = parse_event(provider, &payload)?;

        let result = self.process(provider, headers.id, &event, &payload).await;
        match &result {
            Ok(outcome) => metrics::record_webhook_event(provider.as_str(), outcome.as_str()),
            Err(_) => metrics::record_webhook_event(provider.as_str(), "error"),
        }
        result
    }

    async fn process(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event: &ParsedEvent,
        payload: &Value,
    ) -> Result<WebhookOutcome> {
        let marker = CacheKey::webhook_event(provider.as_str(), event_id);
        if self.seen_in_cache(&marker).await {
            info!(event_type = %event.event_type, "重复的 webhook 投递（缓存命中）");
            return Ok(WebhookOutcome::Duplicate);
        }

        let order = match &event.order_ref {
            Some(OrderRef::Id(id)) => self.order_repo.get_order(*id).await?,
            Some(OrderRef::Number(number)) => self.order_repo.get_order_by_number(number).await?,
            None => None,
        };

        let record = self
            .event_repo
            .record(
                provider,
                event_id,
                &event.event_type,
                order.as_ref().map(|o| o.id),
                payload,
            )
            .await?;
        if record == EventRecord::Processed {
            info!(event_type = %event.event_type, "重复的 webhook 投递");
            self.remember(&marker).await;
            return Ok(WebhookOutcome::Duplicate);
        }

        let outcome = match self.dispatch(provider, event, order).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => {
                warn!(event_type = %event.event_type, error = %e, "webhook 处理失败，等待重投");
                return Err(e);
            }
            Err(e) => {
                error!(
                    event_type = %event.event_type,
                    error = %e,
                    code = e.error_code(),
                    "webhook 事件无法应用到订单"
                );
                WebhookOutcome::Rejected(e.error_code().to_string())
            }
        };

        self.event_repo
            .mark_processed(provider, event_id, Utc::now())
            .await?;
        self.remember(&marker).await;

        Ok(outcome)
    }

    async fn dispatch(
        &self,
        provider: PaymentProvider,
        event: &ParsedEvent,
        order: Option<Order>,
    ) -> Result<WebhookOutcome> {
        if event.action == EventAction::Ignore {
            info!(event_type = %event.event_type, "忽略的 webhook 事件类型");
            return Ok(WebhookOutcome::Ignored);
        }

        let Some(order) = order else {
            error!(event_type = %event.event_type, order_ref = ?event.order_ref, "webhook 对应的订单不存在");
            return Ok(WebhookOutcome::Rejected("ORDER_NOT_FOUND".into()));
        };
        if order.payment_method.provider() != provider {
            return Err(CommerceError::Validation(format!(
                "订单支付方式为 {}，与 webhook 渠道 {} 不符",
                order.payment_method.as_str(),
                provider.as_str()
            )));
        }

        match event.action {
            EventAction::Paid => {
                let confirmation = self.confirm(provider, &order, &event.data).await?;
                let outcome = self
                    .completion
                    .complete_order(CompletionRequest {
                        order_id: order.id,
                        method: order.payment_method,
                        provider,
                        transaction_id: Some(confirmation.transaction_id),
                        paid: Some((confirmation.currency, confirmation.paid_amount)),
                        source: CompletionSource::Webhook,
                    })
                    .await?;
                Ok(if outcome.is_duplicate() {
                    WebhookOutcome::Duplicate
                } else {
                    WebhookOutcome::Processed
                })
            }
            EventAction::Failed => {
                self.completion
                    .mark_payment_failed(order.id, provider, &event.event_type)
                    .await?;
                Ok(WebhookOutcome::Processed)
            }
            EventAction::Ignore => Ok(WebhookOutcome::Ignored),
        }
    }

    /// Dodo 事件自带支付对象；PortOne 事件只带 ID，需回查 API
    async fn confirm(
        &self,
        provider: PaymentProvider,
        order: &Order,
        data: &Value,
    ) -> Result<PaymentConfirmation> {
        match provider {
            PaymentProvider::Dodo => confirmation_from_payment(order, data.clone()),
            _ => {
                let gateway = self.gateways.get(provider)?;
                gateway
                    .confirm(order, &ConfirmPayment::new(order.order_number.as_str()))
                    .await
            }
        }
    }

    async fn seen_in_cache(&self, key: &str) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        match cache.get::<bool>(key).await {
            Ok(seen) => seen.unwrap_or(false),
            Err(e) => {
                warn!(key, error = %e, "webhook 去重缓存读取失败");
                false
            }
        }
    }

    async fn remember(&self, key: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, &true, PROCESSED_MARKER_TTL).await {
                warn!(key, error = %e, "webhook 去重缓存写入失败");
            }
        }
    }
}
