//! 未支付订单过期取消

use chrono::{DateTime, Duration, Utc};
use sheet_shared::config::StoreConfig;
use sqlx::PgPool;
use tracing::info;

use crate::error::Result;
use crate::repository::OrderRepository;

/// 过期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub pending_ttl: Duration,
    /// 无账户转账订单的保留时长
    pub bank_transfer_ttl: Duration,
    pub batch_size: i64,
}

impl ExpiryPolicy {
    pub fn from_config(config: &StoreConfig, batch_size: i64) -> Self {
        Self {
            pending_ttl: Duration::hours(config.pending_order_ttl_hours),
            bank_transfer_ttl: Duration::hours(config.bank_transfer_ttl_hours),
            batch_size,
        }
    }

    pub fn cutoffs(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.pending_ttl, now - self.bank_transfer_ttl)
    }
}

/// 取消一批过期订单，返回取消数量
pub async fn cancel_expired_orders(
    pool: &PgPool,
    policy: &ExpiryPolicy,
    now: DateTime<Utc>,
) -> Result<u64> {
    let (cutoff, bank_transfer_cutoff) = policy.cutoffs(now);
    let mut tx = pool.begin().await?;

    let ids = OrderRepository::lock_expired_pending_in_tx(
        &mut tx,
        cutoff,
        bank_transfer_cutoff,
        policy.batch_size,
    )
    .await?;
    if ids.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    let cancelled = OrderRepository::cancel_pending_in_tx(&mut tx, &ids).await?;
    tx.commit().await?;

    info!(cancelled, "过期未支付订单已取消");
    Ok(cancelled)
}
