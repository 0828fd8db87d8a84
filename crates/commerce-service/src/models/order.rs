//! 订单领域模型：订单、明细、购买记录、购物车

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{OrderStatus, OrderType, PaymentMethod, PaymentProvider, PaymentStatus, SalesType};
use crate::pricing::Currency;

/// 订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_provider: Option<PaymentProvider>,
    /// 应付金额（韩元）
    pub total_amount: i64,
    pub display_currency: Currency,
    /// 展示币种下的应付金额（最小单位）
    pub display_amount: i64,
    /// 渠道交易号；PayPal 在创建订单时先写入 PayPal order id
    pub transaction_id: Option<String>,
    pub metadata: Value,
    pub expected_completion_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// 某币种下的应付金额；KRW 以外只接受下单时锁定的展示币种
    pub fn expected_amount(&self, currency: Currency) -> Option<i64> {
        if currency == Currency::Krw {
            Some(self.total_amount)
        } else if currency == self.display_currency {
            Some(self.display_amount)
        } else {
            None
        }
    }

    /// 充值订单的元数据
    pub fn cash_metadata(&self) -> Option<CashOrderMetadata> {
        if self.order_type != OrderType::Cash {
            return None;
        }
        serde_json::from_value(self.metadata.clone()).ok()
    }
}

/// 充值订单元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOrderMetadata {
    pub charge_amount: i64,
    pub bonus_amount: i64,
}

impl CashOrderMetadata {
    pub fn total_credit(&self) -> i64 {
        self.charge_amount + self.bonus_amount
    }
}

/// 订单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub drum_sheet_id: Uuid,
    /// 下单时的乐谱标题快照
    pub sheet_title: String,
    /// 成交价（韩元）
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// 订单明细及其乐谱当前的交付状态（订单完成时使用）
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderItemSheetState {
    pub drum_sheet_id: Uuid,
    pub price: i64,
    pub sales_type: SalesType,
    pub has_file: bool,
}

impl OrderItemSheetState {
    pub fn awaiting_file(&self) -> bool {
        self.sales_type == SalesType::Preorder && !self.has_file
    }
}

/// 购买记录（下载授权）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub drum_sheet_id: Uuid,
    pub order_id: Uuid,
    pub price_paid: i64,
    pub created_at: DateTime<Utc>,
}

/// 购物车条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sheet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// 待写入的订单
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub total_amount: i64,
    pub display_currency: Currency,
    pub display_amount: i64,
    pub metadata: Value,
}

/// 待写入的订单明细
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub drum_sheet_id: Uuid,
    pub sheet_title: String,
    pub price: i64,
}

/// 订单完成时的状态写入
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidUpdate {
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_provider: PaymentProvider,
    pub transaction_id: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expected_completion_at: Option<DateTime<Utc>>,
}

/// 生成订单号：DS + 时间戳(yyyyMMddHHmmss) + 6 位随机数
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    use rand::Rng;
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!("DS{}{:06}", now.format("%Y%m%d%H%M%S"), suffix)
}
