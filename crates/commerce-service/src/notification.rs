//! 订单通知
//!
//! 支付完成后发送订单确认邮件。发送失败不影响订单，由调用方记录告警。

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use sheet_shared::config::NotificationConfig;
use tracing::{debug, instrument};

use crate::error::{CommerceError, Result};
use crate::models::{OrderStatus, OrderType};
use crate::pricing::{Currency, format_amount};

/// 订单确认通知内容
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNotice {
    pub email: String,
    pub order_number: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub item_titles: Vec<String>,
    pub total_amount: i64,
    /// 充值订单的入账积分（含赠送）
    pub credited: Option<i64>,
}

impl OrderNotice {
    pub fn subject(&self) -> String {
        match self.order_type {
            OrderType::Cash => format!("[DrumSheets] 캐시 충전 완료 ({})", self.order_number),
            OrderType::Product => format!("[DrumSheets] 주문 확인 ({})", self.order_number),
        }
    }

    pub fn html_body(&self) -> String {
        let total = format_amount(self.total_amount, Currency::Krw);
        let mut body = format!(
            "<p>주문번호: <strong>{}</strong></p><p>결제금액: {}</p>",
            self.order_number, total
        );

        if let Some(credited) = self.credited {
            body.push_str(&format!(
                "<p>충전된 캐시: {}</p>",
                format_amount(credited, Currency::Krw)
            ));
        }
        if !self.item_titles.is_empty() {
            body.push_str("<ul>");
            for title in &self.item_titles {
                body.push_str(&format!("<li>{}</li>", escape_html(title)));
            }
            body.push_str("</ul>");
        }
        if self.status == OrderStatus::Processing {
            body.push_str("<p>선주문 악보는 제작이 완료되면 다운로드할 수 있습니다.</p>");
        }
        body
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 订单通知接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn send_order_confirmation(&self, notice: &OrderNotice) -> Result<()>;
}

/// 通过 HTTP 邮件 API 发送
pub struct EmailNotifier {
    client: reqwest::Client,
    config: NotificationConfig,
}

impl EmailNotifier {
    pub fn new(client: reqwest::Client, config: NotificationConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl OrderNotifier for EmailNotifier {
    #[instrument(skip(self, notice), fields(order_number = %notice.order_number))]
    async fn send_order_confirmation(&self, notice: &OrderNotice) -> Result<()> {
        let response = self
            .client
            .post(&self.config.email_api_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.email_api_key))
            .json(&json!({
                "from": self.config.from_address,
                "to": [notice.email],
                "subject": notice.subject(),
                "html": notice.html_body(),
            }))
            .send()
            .await
            .map_err(|e| CommerceError::Internal(format!("邮件发送失败: {}", e)))?;

        if !response.status().is_success() {
            return Err(CommerceError::Internal(format!(
                "邮件服务返回 {}",
                response.status()
            )));
        }

        debug!("订单确认邮件已发送");
        Ok(())
    }
}

/// 未配置邮件服务时使用
pub struct NoopNotifier;

#[async_trait]
impl OrderNotifier for NoopNotifier {
    async fn send_order_confirmation(&self, notice: &OrderNotice) -> Result<()> {
        debug!(order_number = %notice.order_number, "邮件服务未配置，跳过订单通知");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> OrderNotice {
        OrderNotice {
            email: "drummer@example.com".into(),
            order_number: "DS20261019120000123456".into(),
            order_type: OrderType::Product,
            status: OrderStatus::Processing,
            item_titles: vec!["Rock <Live>".into()],
            total_amount: 12_000,
            credited: None,
        }
    }

    #[test]
    fn test_product_notice_body() {
        let notice = notice();
        assert!(notice.subject().contains("주문 확인"));
        let body = notice.html_body();
        assert!(body.contains("₩12,000"));
        assert!(body.contains("Rock &lt;Live&gt;"));
        assert!(body.contains("선주문"));
    }

    #[test]
    fn test_cash_notice_body() {
        let notice = OrderNotice {
            order_type: OrderType::Cash,
            status: OrderStatus::Completed,
            item_titles: vec![],
            total_amount: 10_000,
            credited: Some(10_500),
            ..notice()
        };
        assert!(notice.subject().contains("캐시 충전"));
        assert!(notice.html_body().contains("₩10,500"));
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        assert!(NoopNotifier.send_order_confirmation(&notice()).await.is_ok());
    }
}
