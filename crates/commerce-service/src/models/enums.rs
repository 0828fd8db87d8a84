//! 商店枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 乐谱销售方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesType {
    /// 即时下载
    #[default]
    Instant,
    /// 预购：文件上传后才可下载
    Preorder,
}

/// 订单类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum OrderType {
    /// 购买乐谱
    #[default]
    Product,
    /// 积分充值
    Cash,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Cash => "cash",
        }
    }
}

/// 订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum OrderStatus {
    /// 待支付
    #[default]
    Pending,
    /// 已支付，等待预购乐谱完成
    Processing,
    /// 已完成
    Completed,
    /// 已取消
    Cancelled,
    /// 已退款
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// 终态订单不再接受支付
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

/// 支付方式（用户可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PaymentMethod {
    /// 信用卡（KG 이니시스，经 PortOne）
    Card,
    /// 카카오페이（经 PortOne）
    KakaoPay,
    /// 无账户转账，管理员确认入账
    #[serde(rename = "bank_transfer")]
    #[sqlx(rename = "bank_transfer")]
    BankTransfer,
    PayPal,
    Dodo,
    /// 站内积分
    Points,
}

impl PaymentMethod {
    /// 支付方式对应的渠道
    pub fn provider(&self) -> PaymentProvider {
        match self {
            Self::Card | Self::KakaoPay => PaymentProvider::PortOne,
            Self::BankTransfer => PaymentProvider::Manual,
            Self::PayPal => PaymentProvider::PayPal,
            Self::Dodo => PaymentProvider::Dodo,
            Self::Points => PaymentProvider::Points,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::KakaoPay => "kakaopay",
            Self::BankTransfer => "bank_transfer",
            Self::PayPal => "paypal",
            Self::Dodo => "dodo",
            Self::Points => "points",
        }
    }
}

/// 支付渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PaymentProvider {
    PortOne,
    PayPal,
    Dodo,
    Points,
    /// 人工确认（无账户转账）
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortOne => "portone",
            Self::PayPal => "paypal",
            Self::Dodo => "dodo",
            Self::Points => "points",
            Self::Manual => "manual",
        }
    }
}

/// 积分流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum CashTransactionType {
    /// 充值入账（含赠送）
    Charge,
    /// 消费扣减
    Use,
    /// 退款
    Refund,
    /// 管理员调整
    AdminAdjust,
}

/// 订单完成的触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSource {
    /// 前端回跳后主动确认
    Client,
    /// 支付渠道 webhook
    Webhook,
    /// 积分支付
    Points,
    /// 管理员操作
    Admin,
}

impl CompletionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Webhook => "webhook",
            Self::Points => "points",
            Self::Admin => "admin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_provider() {
        assert_eq!(PaymentMethod::Card.provider(), PaymentProvider::PortOne);
        assert_eq!(PaymentMethod::KakaoPay.provider(), PaymentProvider::PortOne);
        assert_eq!(PaymentMethod::BankTransfer.provider(), PaymentProvider::Manual);
        assert_eq!(PaymentMethod::Points.provider(), PaymentProvider::Points);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::KakaoPay).unwrap(),
            "\"kakaopay\""
        );
        assert_eq!(serde_json::to_string(&SalesType::Preorder).unwrap(), "\"PREORDER\"");
        assert_eq!(
            serde_json::to_string(&CashTransactionType::AdminAdjust).unwrap(),
            "\"admin_adjust\""
        );

        let method: PaymentMethod = serde_json::from_str("\"paypal\"").unwrap();
        assert_eq!(method, PaymentMethod::PayPal);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(OrderStatus::Cancelled.is_closed());
        assert!(OrderStatus::Refunded.is_closed());
        assert!(!OrderStatus::Processing.is_closed());
    }
}
