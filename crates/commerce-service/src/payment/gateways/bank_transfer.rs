//! 无账户转账（무통장입금）
//!
//! 没有在线渠道：prepare 返回收款账户，入账由管理员确认。

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use sheet_shared::config::BankTransferConfig;

use crate::error::Result;
use crate::models::{Currency, Order, PaymentProvider};
use crate::payment::gateway::{
    ConfirmPayment, PaymentConfirmation, PaymentGateway, PrepareContext, PreparedPayment,
};

pub struct BankTransferGateway {
    config: BankTransferConfig,
    deposit_window: Duration,
}

impl BankTransferGateway {
    pub fn new(config: BankTransferConfig, deposit_window_hours: i64) -> Self {
        Self {
            config,
            deposit_window: Duration::hours(deposit_window_hours),
        }
    }
}

#[async_trait]
impl PaymentGateway for BankTransferGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Manual
    }

    fn description(&self) -> &'static str {
        "Bank transfer (manual deposit confirmation)"
    }

    async fn prepare(&self, order: &Order, _ctx: &PrepareContext) -> Result<PreparedPayment> {
        Ok(PreparedPayment::BankTransfer {
            bank_name: self.config.bank_name.clone(),
            account_number: self.config.account_number.clone(),
            account_holder: self.config.account_holder.clone(),
            amount: order.total_amount,
            deposit_deadline: order.created_at + self.deposit_window,
        })
    }

    /// 管理员已核对入账，按订单金额确认
    async fn confirm(
        &self,
        order: &Order,
        request: &ConfirmPayment,
    ) -> Result<PaymentConfirmation> {
        Ok(PaymentConfirmation {
            provider: PaymentProvider::Manual,
            transaction_id: request.payment_id.clone(),
            paid_amount: order.total_amount,
            currency: Currency::Krw,
            raw: json!({ "confirmedBy": "admin", "reference": request.payment_id }),
        })
    }
}
