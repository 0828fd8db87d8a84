//! 购买记录仓储
//!
//! 购买记录即下载授权；退款订单对应的记录在退款时删除，查询时也排除退款订单。
//! 每个用户每张乐谱只有一条记录，同一乐谱被多个已支付订单购买时记录挂在最早的订单上。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::traits::PurchaseRepositoryTrait;
use crate::error::Result;
use crate::models::{OrderStatus, PaymentStatus, Purchase, SalesType};

/// 我的乐谱库中的一行
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRow {
    pub sheet_id: Uuid,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: Option<String>,
    pub sales_type: SalesType,
    pub has_file: bool,
    pub order_id: Uuid,
    pub price_paid: i64,
    pub purchased_at: DateTime<Utc>,
    pub expected_completion_at: Option<DateTime<Utc>>,
}

/// 购买记录仓储
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn owned_sheet_ids(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if sheet_ids.is_empty() {
            return Ok(Vec::new());
        }

        let owned: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT p.drum_sheet_id
            FROM purchases p
            JOIN orders o ON o.id = p.order_id
            WHERE p.user_id = $1
              AND p.drum_sheet_id = ANY($2)
              AND o.status <> $3
            "#,
        )
        .bind(user_id)
        .bind(sheet_ids)
        .bind(OrderStatus::Refunded)
        .fetch_all(&self.pool)
        .await?;

        Ok(owned)
    }

    pub async fn find_active_purchase(
        &self,
        user_id: Uuid,
        sheet_id: Uuid,
    ) -> Result<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT p.id, p.user_id, p.drum_sheet_id, p.order_id, p.price_paid, p.created_at
            FROM purchases p
            JOIN orders o ON o.id = p.order_id
            WHERE p.user_id = $1 AND p.drum_sheet_id = $2 AND o.status <> $3
            "#,
        )
        .bind(user_id)
        .bind(sheet_id)
        .bind(OrderStatus::Refunded)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    pub async fn list_library(&self, user_id: Uuid) -> Result<Vec<LibraryRow>> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT s.id AS sheet_id, s.title, s.artist, s.thumbnail_url, s.sales_type,
                   (s.pdf_path IS NOT NULL AND btrim(s.pdf_path) <> '') AS has_file,
                   p.order_id, p.price_paid, p.created_at AS purchased_at,
                   o.expected_completion_at
            FROM purchases p
            JOIN drum_sheets s ON s.id = p.drum_sheet_id
            JOIN orders o ON o.id = p.order_id
            WHERE p.user_id = $1 AND o.status <> $2
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(OrderStatus::Refunded)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// 写入购买记录，已拥有的乐谱跳过；返回新增条数
    pub async fn insert_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        order_id: Uuid,
        items: &[(Uuid, i64)],
    ) -> Result<u64> {
        let mut inserted = 0;
        for (sheet_id, price_paid) in items {
            let result = sqlx::query(
                r#"
                INSERT INTO purchases (user_id, drum_sheet_id, order_id, price_paid)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, drum_sheet_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(sheet_id)
            .bind(order_id)
            .bind(price_paid)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// 删除某订单产生的购买记录，返回被删除的乐谱 ID
    pub async fn delete_by_order_in_tx(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let sheet_ids: Vec<Uuid> = sqlx::query_scalar(
            "DELETE FROM purchases WHERE order_id = $1 RETURNING drum_sheet_id",
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(sheet_ids)
    }

    /// 把购买记录转挂到该用户其他已支付且包含该乐谱的订单上，返回转挂条数
    pub async fn reassign_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        excluded_order_id: Uuid,
        sheet_ids: &[Uuid],
    ) -> Result<u64> {
        if sheet_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO purchases (user_id, drum_sheet_id, order_id, price_paid)
            SELECT DISTINCT ON (oi.drum_sheet_id) o.user_id, oi.drum_sheet_id, o.id, oi.price
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.user_id = $1
              AND o.id <> $2
              AND o.payment_status = $3
              AND oi.drum_sheet_id = ANY($4)
            ORDER BY oi.drum_sheet_id, o.paid_at, o.id
            ON CONFLICT (user_id, drum_sheet_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(excluded_order_id)
        .bind(PaymentStatus::Paid)
        .bind(sheet_ids)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PurchaseRepositoryTrait for PurchaseRepository {
    async fn owned_sheet_ids(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        self.owned_sheet_ids(user_id, sheet_ids).await
    }

    async fn find_active_purchase(
        &self,
        user_id: Uuid,
        sheet_id: Uuid,
    ) -> Result<Option<Purchase>> {
        self.find_active_purchase(user_id, sheet_id).await
    }

    async fn list_library(&self, user_id: Uuid) -> Result<Vec<LibraryRow>> {
        self.list_library(user_id).await
    }
}
