//! 购物车仓储

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::CartRepositoryTrait;
use crate::error::Result;
use crate::models::CartItem;

pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, user_id, sheet_id, created_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn add_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, sheet_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, sheet_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(sheet_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND sheet_id = $2")
            .bind(user_id)
            .bind(sheet_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_items(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<u64> {
        if sheet_ids.is_empty() {
            return Ok(0);
        }

        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND sheet_id = ANY($2)")
                .bind(user_id)
                .bind(sheet_ids)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CartRepositoryTrait for CartRepository {
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
        self.list_items(user_id).await
    }

    async fn add_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        self.add_item(user_id, sheet_id).await
    }

    async fn remove_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool> {
        self.remove_item(user_id, sheet_id).await
    }

    async fn remove_items(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<u64> {
        self.remove_items(user_id, sheet_ids).await
    }

    async fn clear(&self, user_id: Uuid) -> Result<u64> {
        self.clear(user_id).await
    }
}
