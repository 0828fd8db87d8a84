//! 支付事件仓储
//!
//! webhook 投递按 (provider, event_id) 去重

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::{EventRecord, PaymentEventRepositoryTrait};
use crate::error::Result;
use crate::models::PaymentProvider;

pub struct PaymentEventRepository {
    pool: PgPool,
}

impl PaymentEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 记录一次投递；已存在时根据 processed_at 判断是否已处理
    pub async fn record(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        order_id: Option<Uuid>,
        payload: &serde_json::Value,
    ) -> Result<EventRecord> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO payment_events (provider, event_id, event_type, order_id, payload)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(event_type)
        .bind(order_id)
        .bind(payload)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            return Ok(EventRecord::New);
        }

        let processed_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT processed_at FROM payment_events WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(match processed_at {
            Some(_) => EventRecord::Processed,
            None => EventRecord::Unprocessed,
        })
    }

    pub async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payment_events
            SET processed_at = $3
            WHERE provider = $1 AND event_id = $2 AND processed_at IS NULL
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PaymentEventRepositoryTrait for PaymentEventRepository {
    async fn record(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        order_id: Option<Uuid>,
        payload: &serde_json::Value,
    ) -> Result<EventRecord> {
        self.record(provider, event_id, event_type, order_id, payload)
            .await
    }

    async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.mark_processed(provider, event_id, at).await
    }
}
