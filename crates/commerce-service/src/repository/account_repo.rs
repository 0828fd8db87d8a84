//! 账户仓储
//!
//! 用户资料与积分流水。余额变更必须先锁定资料行再写流水

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::AccountRepositoryTrait;
use crate::error::Result;
use crate::models::{CashTransaction, NewCashTransaction, Profile};

const PROFILE_COLUMNS: &str =
    "id, email, display_name, credits, is_admin, created_at, updated_at";

/// 账户仓储
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    pub async fn list_cash_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CashTransaction>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_transactions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, CashTransaction>(
            r#"
            SELECT id, user_id, transaction_type, amount, bonus_amount, balance_after,
                   description, order_id, created_by, created_at
            FROM cash_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ==================== 事务操作 ====================

    /// 锁定用户资料行
    pub async fn lock_profile_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 FOR UPDATE");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(profile)
    }

    /// 写入新余额，调用方需已持有行锁
    pub async fn set_credits_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        credits: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE profiles SET credits = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(credits)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn insert_cash_transaction_in_tx(
        conn: &mut PgConnection,
        tx: &NewCashTransaction,
    ) -> Result<CashTransaction> {
        let row = sqlx::query_as::<_, CashTransaction>(
            r#"
            INSERT INTO cash_transactions (
                user_id, transaction_type, amount, bonus_amount, balance_after,
                description, order_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, transaction_type, amount, bonus_amount, balance_after,
                      description, order_id, created_by, created_at
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.transaction_type)
        .bind(tx.amount)
        .bind(tx.bonus_amount)
        .bind(tx.balance_after)
        .bind(&tx.description)
        .bind(tx.order_id)
        .bind(tx.created_by)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.get_profile(user_id).await
    }

    async fn list_cash_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CashTransaction>, i64)> {
        self.list_cash_transactions(user_id, limit, offset).await
    }
}
