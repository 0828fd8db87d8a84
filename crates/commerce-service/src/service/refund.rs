//! 管理员退款
//!
//! 只处理站内状态：订单置为 refunded、移除该订单的购买记录、按支付方式回滚积分。
//! 被移除的乐谱若还由该用户另一笔已支付订单购买，购买记录转挂到那笔订单。
//! 不调用支付渠道的退款接口。

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{
    CashTransactionType, NewCashTransaction, Order, OrderType, PaymentMethod, PaymentProvider,
};
use crate::repository::{AccountRepository, OrderRepository, PurchaseRepository};

/// 退款对积分的影响（正数返还，负数扣回）
pub fn refund_credit_delta(order: &Order) -> Result<i64> {
    if !order.is_paid() {
        return Err(CommerceError::invalid_status(
            order.id,
            order.payment_status.as_str(),
        ));
    }

    match order.order_type {
        OrderType::Cash => {
            let credit = order.cash_metadata().ok_or_else(|| {
                CommerceError::Internal(format!("充值订单缺少充值元数据: {}", order.id))
            })?;
            Ok(-credit.total_credit())
        }
        OrderType::Product
            if order.payment_method == PaymentMethod::Points
                || order.payment_provider == Some(PaymentProvider::Points) =>
        {
            Ok(order.total_amount)
        }
        OrderType::Product => Ok(0),
    }
}

/// 退款结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub order: Order,
    pub credit_delta: i64,
    pub balance_after: Option<i64>,
    pub purchases_removed: u64,
    /// 由其他已支付订单继续持有的购买记录
    pub purchases_reassigned: u64,
}

pub struct RefundService {
    pool: PgPool,
}

impl RefundService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn refund_order(&self, admin_id: Uuid, order_id: Uuid) -> Result<RefundOutcome> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::lock_in_tx(&mut tx, order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let credit_delta = refund_credit_delta(&order)?;

        let mut balance_after = None;
        if credit_delta != 0 {
            let profile = AccountRepository::lock_profile_in_tx(&mut tx, order.user_id)
                .await?
                .ok_or(CommerceError::ProfileNotFound(order.user_id))?;
            let balance = profile.credits + credit_delta;
            if balance < 0 {
                return Err(CommerceError::InsufficientCredits {
                    required: -credit_delta,
                    available: profile.credits,
                });
            }

            AccountRepository::set_credits_in_tx(&mut tx, order.user_id, balance).await?;
            AccountRepository::insert_cash_transaction_in_tx(
                &mut tx,
                &NewCashTransaction {
                    user_id: order.user_id,
                    transaction_type: CashTransactionType::Refund,
                    amount: credit_delta,
                    bonus_amount: 0,
                    balance_after: balance,
                    description: Some(format!("환불 ({})", order.order_number)),
                    order_id: Some(order.id),
                    created_by: Some(admin_id),
                },
            )
            .await?;
            balance_after = Some(balance);
        }

        let removed = PurchaseRepository::delete_by_order_in_tx(&mut tx, order.id).await?;
        let purchases_reassigned =
            PurchaseRepository::reassign_in_tx(&mut tx, order.user_id, order.id, &removed).await?;
        let purchases_removed = (removed.len() as u64).saturating_sub(purchases_reassigned);
        let refunded = OrderRepository::mark_refunded_in_tx(&mut tx, order.id).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            admin_id = %admin_id,
            credit_delta,
            purchases_removed,
            purchases_reassigned,
            "订单已退款"
        );

        Ok(RefundOutcome {
            order: refunded,
            credit_delta,
            balance_after,
            purchases_removed,
            purchases_reassigned,
        })
    }
}
