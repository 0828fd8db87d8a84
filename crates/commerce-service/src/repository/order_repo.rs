//! 订单仓储
//!
//! 订单与明细的数据访问；支付完成、取消、退款等状态迁移在事务中执行

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::OrderRepositoryTrait;
use crate::error::{CommerceError, Result};
use crate::models::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderItemSheetState, OrderPaidUpdate, OrderStatus,
    PaymentMethod, PaymentStatus,
};

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, order_type, status, payment_status, payment_method,
    payment_provider, total_amount, display_currency, display_amount, transaction_id,
    metadata, expected_completion_at, paid_at, completed_at, created_at, updated_at
"#;

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 下单 ====================

    /// 写入订单及明细（单事务）
    pub async fn create_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let created = Self::insert_order_in_tx(&mut tx, order).await?;
        Self::insert_items_in_tx(&mut tx, order.id, items).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn insert_order_in_tx(conn: &mut PgConnection, order: &NewOrder) -> Result<Order> {
        let sql = format!(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, order_type, status, payment_status,
                payment_method, total_amount, display_currency, display_amount, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Order>(&sql)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.user_id)
            .bind(order.order_type)
            .bind(OrderStatus::Pending)
            .bind(PaymentStatus::Pending)
            .bind(order.payment_method)
            .bind(order.total_amount)
            .bind(order.display_currency)
            .bind(order.display_amount)
            .bind(&order.metadata)
            .fetch_one(&mut *conn)
            .await?;

        Ok(created)
    }

    pub async fn insert_items_in_tx(
        conn: &mut PgConnection,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, drum_sheet_id, sheet_title, price)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id)
            .bind(item.drum_sheet_id)
            .bind(&item.sheet_title)
            .bind(item.price)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    // ==================== 查询 ====================

    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, drum_sheet_id, sheet_title, price, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn list_user_orders(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((orders, total))
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((orders, total))
    }

    // ==================== 非事务状态更新 ====================

    pub async fn set_transaction_reference(&self, id: Uuid, reference: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET transaction_id = $2, updated_at = NOW()
            WHERE id = $1 AND payment_status = $3
            "#,
        )
        .bind(id)
        .bind(reference)
        .bind(PaymentStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn cancel_pending(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let cancelled = Self::cancel_pending_in_tx(&mut conn, &[id]).await?;
        Ok(cancelled > 0)
    }

    pub async fn mark_payment_failed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3 AND payment_status = $4
            "#,
        )
        .bind(id)
        .bind(PaymentStatus::Failed)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== 事务操作 ====================

    /// 锁定订单行（SELECT ... FOR UPDATE）
    pub async fn lock_in_tx(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    /// 明细及对应乐谱的当前交付状态
    pub async fn list_item_states_in_tx(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemSheetState>> {
        let states = sqlx::query_as::<_, OrderItemSheetState>(
            r#"
            SELECT oi.drum_sheet_id, oi.price, s.sales_type,
                   (s.pdf_path IS NOT NULL AND btrim(s.pdf_path) <> '') AS has_file
            FROM order_items oi
            JOIN drum_sheets s ON s.id = oi.drum_sheet_id
            WHERE oi.order_id = $1
            ORDER BY oi.created_at ASC, oi.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(states)
    }

    /// 写入支付完成状态
    pub async fn mark_paid_in_tx(
        conn: &mut PgConnection,
        id: Uuid,
        update: &OrderPaidUpdate,
    ) -> Result<Order> {
        let sql = format!(
            r#"
            UPDATE orders
            SET status = $2,
                payment_status = $3,
                payment_method = $4,
                payment_provider = $5,
                transaction_id = COALESCE($6, transaction_id),
                paid_at = $7,
                completed_at = $8,
                expected_completion_at = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(update.status)
            .bind(PaymentStatus::Paid)
            .bind(update.payment_method)
            .bind(update.payment_provider)
            .bind(&update.transaction_id)
            .bind(update.paid_at)
            .bind(update.completed_at)
            .bind(update.expected_completion_at)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(CommerceError::OrderNotFound(id))?;

        Ok(order)
    }

    /// 退款：订单与支付状态同时置为 refunded
    pub async fn mark_refunded_in_tx(conn: &mut PgConnection, id: Uuid) -> Result<Order> {
        let sql = format!(
            r#"
            UPDATE orders
            SET status = $2, payment_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(OrderStatus::Refunded)
            .bind(PaymentStatus::Refunded)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(CommerceError::OrderNotFound(id))?;

        Ok(order)
    }

    /// 锁定包含该乐谱、且所有明细均已可下载的处理中订单
    pub async fn lock_fulfillable_in_tx(
        conn: &mut PgConnection,
        sheet_id: Uuid,
    ) -> Result<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            WHERE o.status = $2
              AND EXISTS (
                  SELECT 1 FROM order_items oi
                  WHERE oi.order_id = o.id AND oi.drum_sheet_id = $1
              )
              AND NOT EXISTS (
                  SELECT 1 FROM order_items oi
                  JOIN drum_sheets s ON s.id = oi.drum_sheet_id
                  WHERE oi.order_id = o.id
                    AND (s.pdf_path IS NULL OR btrim(s.pdf_path) = '')
              )
            ORDER BY o.created_at ASC
            FOR UPDATE OF o
            "#
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(sheet_id)
            .bind(OrderStatus::Processing)
            .fetch_all(&mut *conn)
            .await?;

        Ok(orders)
    }

    /// 处理中订单转为完成
    pub async fn complete_processing_in_tx(
        conn: &mut PgConnection,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, completed_at = $3, updated_at = NOW()
            WHERE id = ANY($1) AND status = $4
            "#,
        )
        .bind(ids)
        .bind(OrderStatus::Completed)
        .bind(now)
        .bind(OrderStatus::Processing)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// 锁定超时未支付的订单（SKIP LOCKED，多实例安全）
    ///
    /// 无账户转账订单使用单独的截止时间
    pub async fn lock_expired_pending_in_tx(
        conn: &mut PgConnection,
        cutoff: DateTime<Utc>,
        bank_transfer_cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM orders
            WHERE status = $1
              AND payment_status IN ($2, $3)
              AND (
                  (payment_method <> $4 AND created_at < $5)
                  OR (payment_method = $4 AND created_at < $6)
              )
            ORDER BY created_at ASC
            LIMIT $7
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Pending)
        .bind(PaymentStatus::Failed)
        .bind(PaymentMethod::BankTransfer)
        .bind(cutoff)
        .bind(bank_transfer_cutoff)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ids)
    }

    /// 取消待支付订单
    pub async fn cancel_pending_in_tx(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                payment_status = CASE WHEN payment_status = $3 THEN $4 ELSE payment_status END,
                updated_at = NOW()
            WHERE id = ANY($1) AND status = $5
            "#,
        )
        .bind(ids)
        .bind(OrderStatus::Cancelled)
        .bind(PaymentStatus::Pending)
        .bind(PaymentStatus::Cancelled)
        .bind(OrderStatus::Pending)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn create_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
        self.create_order(order, items).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        self.get_order_by_number(order_number).await
    }

    async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        self.list_items(order_id).await
    }

    async fn list_user_orders(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)> {
        self.list_user_orders(user_id, limit, offset).await
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)> {
        self.list_orders(status, limit, offset).await
    }

    async fn set_transaction_reference(&self, id: Uuid, reference: &str) -> Result<()> {
        self.set_transaction_reference(id, reference).await
    }

    async fn cancel_pending(&self, id: Uuid) -> Result<bool> {
        self.cancel_pending(id).await
    }

    async fn mark_payment_failed(&self, id: Uuid) -> Result<bool> {
        self.mark_payment_failed(id).await
    }
}
