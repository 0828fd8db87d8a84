//! 积分支付
//!
//! 扣减积分与订单完成在同一事务中执行，任一步失败整体回滚。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::completion::{
    CompletionOutcome, CompletionRequest, CompletionService, complete_in_tx,
};
use crate::error::{CommerceError, Result};
use crate::models::{
    CashTransactionType, CompletionSource, NewCashTransaction, Order, OrderStatus, OrderType,
    PaymentMethod, PaymentProvider,
};
use crate::repository::{
    AccountRepository, AccountRepositoryTrait, CartRepositoryTrait, OrderRepository,
    OrderRepositoryTrait,
};

/// 积分支付前置检查
fn check_points_payable(order: &Order, user_id: Uuid) -> Result<()> {
    if !order.is_owned_by(user_id) {
        return Err(CommerceError::OrderForbidden(order.id));
    }
    if order.order_type == OrderType::Cash {
        return Err(CommerceError::Validation("充值订单不能使用积分支付".into()));
    }
    if order.status != OrderStatus::Pending {
        return Err(CommerceError::invalid_status(order.id, order.status.as_str()));
    }
    Ok(())
}

pub struct PointsService<CartR, AccR, OR>
where
    CartR: CartRepositoryTrait,
    AccR: AccountRepositoryTrait,
    OR: OrderRepositoryTrait,
{
    completion: Arc<CompletionService<CartR, AccR, OR>>,
}

impl<CartR, AccR, OR> PointsService<CartR, AccR, OR>
where
    CartR: CartRepositoryTrait,
    AccR: AccountRepositoryTrait,
    OR: OrderRepositoryTrait,
{
    pub fn new(completion: Arc<CompletionService<CartR, AccR, OR>>) -> Self {
        Self { completion }
    }

    /// 用积分支付乐谱订单
    #[instrument(skip(self))]
    pub async fn pay_with_points(&self, user_id: Uuid, order_id: Uuid) -> Result<CompletionOutcome> {
        let started = Instant::now();
        let now = Utc::now();
        let mut tx = self.completion.pool().begin().await?;

        let order = OrderRepository::lock_in_tx(&mut tx, order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        if order.is_owned_by(user_id) && order.is_paid() {
            return Ok(CompletionOutcome::AlreadyCompleted(order));
        }
        check_points_payable(&order, user_id)?;

        let profile = AccountRepository::lock_profile_in_tx(&mut tx, user_id)
            .await?
            .ok_or(CommerceError::ProfileNotFound(user_id))?;
        if profile.credits < order.total_amount {
            return Err(CommerceError::InsufficientCredits {
                required: order.total_amount,
                available: profile.credits,
            });
        }

        let balance = profile.credits - order.total_amount;
        AccountRepository::set_credits_in_tx(&mut tx, user_id, balance).await?;
        AccountRepository::insert_cash_transaction_in_tx(
            &mut tx,
            &NewCashTransaction {
                user_id,
                transaction_type: CashTransactionType::Use,
                amount: -order.total_amount,
                bonus_amount: 0,
                balance_after: balance,
                description: Some(format!("악보 구매 ({})", order.order_number)),
                order_id: Some(order.id),
                created_by: None,
            },
        )
        .await?;

        let request = CompletionRequest {
            order_id,
            method: PaymentMethod::Points,
            provider: PaymentProvider::Points,
            transaction_id: Some(format!("points-{}", order.order_number)),
            paid: None,
            source: CompletionSource::Points,
        };
        let outcome = complete_in_tx(&mut tx, &request, self.completion.settings(), now).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            debited = order.total_amount,
            balance_after = balance,
            "积分支付完成"
        );

        self.completion
            .after_commit(&outcome, PaymentProvider::Points, started)
            .await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use crate::test_fixtures::sample_order;

    #[test]
    fn test_points_payable_checks() {
        let order = sample_order(OrderType::Product);
        assert!(check_points_payable(&order, order.user_id).is_ok());

        let err = check_points_payable(&order, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.error_code(), "ORDER_FORBIDDEN");

        let cash = sample_order(OrderType::Cash);
        let err = check_points_payable(&cash, cash.user_id).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let mut cancelled = sample_order(OrderType::Product);
        cancelled.status = OrderStatus::Cancelled;
        cancelled.payment_status = PaymentStatus::Cancelled;
        let err = check_points_payable(&cancelled, cancelled.user_id).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ORDER_STATUS");
    }
}
