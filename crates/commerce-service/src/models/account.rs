//! 账户领域模型：用户资料、积分流水、支付事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{CashTransactionType, PaymentProvider};

/// 用户资料（与 Supabase auth.users 一一对应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// 积分余额（韩元）
    pub credits: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 积分流水
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CashTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: CashTransactionType,
    /// 变动金额，扣减为负
    pub amount: i64,
    /// 赠送部分（仅充值）
    pub bonus_amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    /// 管理员调整时的操作人
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的积分流水
#[derive(Debug, Clone, PartialEq)]
pub struct NewCashTransaction {
    pub user_id: Uuid,
    pub transaction_type: CashTransactionType,
    pub amount: i64,
    pub bonus_amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub order_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// 支付渠道推送的事件（webhook 去重记录）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub id: Uuid,
    pub provider: PaymentProvider,
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<Uuid>,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
    /// 处理成功的时间；为空表示尚未处理完，重投时需重新处理
    pub processed_at: Option<DateTime<Utc>>,
}
