//! 过期未支付订单清理 Worker
//!
//! 定期取消超过保留时长仍未支付的订单。无账户转账订单保留更久，等待管理员确认入账。
//! 锁行使用 `FOR UPDATE SKIP LOCKED`，多实例部署时不会重复处理。

use std::time::Duration;

use chrono::Utc;
use commerce::service::{ExpiryPolicy, cancel_expired_orders};
use sheet_shared::config::StoreConfig;
use sheet_shared::observability::metrics;
use sqlx::PgPool;
use tracing::{error, info};

/// 单轮最多连续处理的批次数，避免一次轮询长时间占用连接
const MAX_BATCHES_PER_RUN: usize = 20;

pub struct PendingOrderWorker {
    pool: PgPool,
    policy: ExpiryPolicy,
    poll_interval: Duration,
}

impl PendingOrderWorker {
    pub fn new(pool: PgPool, policy: ExpiryPolicy, poll_interval_secs: u64) -> Self {
        Self {
            pool,
            policy,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// 默认每 5 分钟轮询，每批 200 单
    pub fn with_defaults(pool: PgPool, store: &StoreConfig) -> Self {
        Self::new(pool, ExpiryPolicy::from_config(store, 200), 300)
    }

    /// 主循环：持续运行直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.policy.batch_size,
            "PendingOrderWorker 已启动"
        );

        loop {
            match self.run_once().await {
                Ok(0) => {}
                Ok(cancelled) => info!(cancelled, "本轮取消过期订单"),
                Err(e) => error!(error = %e, "取消过期订单出错"),
            }

            metrics::set_worker_last_run("pending_order_worker");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 处理一轮：批次取满时继续下一批
    pub async fn run_once(&self) -> commerce::Result<u64> {
        let mut total = 0;
        for _ in 0..MAX_BATCHES_PER_RUN {
            let cancelled = cancel_expired_orders(&self.pool, &self.policy, Utc::now()).await?;
            total += cancelled;
            if (cancelled as i64) < self.policy.batch_size {
                break;
            }
        }
        Ok(total)
    }
}
