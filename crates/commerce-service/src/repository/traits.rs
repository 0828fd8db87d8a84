//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持 mock 测试。
//! 需要行锁的事务性写入不在 trait 中，由各仓储的 `*_in_tx` 关联函数提供。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CartItem, CashTransaction, Category, Collection, DrumSheet, NewOrder, NewOrderItem, Order,
    OrderItem, OrderStatus, PaymentProvider, Profile, Purchase, SheetFilter,
};

use super::purchase_repo::LibraryRow;

/// 目录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    /// 分页查询上架乐谱，返回 (当前页, 总数)
    async fn list_sheets(&self, filter: &SheetFilter) -> Result<(Vec<DrumSheet>, i64)>;
    /// 按 ID 获取乐谱（含下架）
    async fn get_sheet(&self, id: Uuid) -> Result<Option<DrumSheet>>;
    async fn get_sheets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DrumSheet>>;
    async fn list_collections(&self) -> Result<Vec<Collection>>;
    async fn get_collection(&self, id: Uuid) -> Result<Option<Collection>>;
    /// 合集包含的乐谱，按合集内排序
    async fn list_collection_sheets(&self, collection_id: Uuid) -> Result<Vec<DrumSheet>>;
}

/// 购物车仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepositoryTrait: Send + Sync {
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>>;
    /// 已存在时不重复插入，返回是否新增
    async fn add_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool>;
    async fn remove_item(&self, user_id: Uuid, sheet_id: Uuid) -> Result<bool>;
    async fn remove_items(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<u64>;
    async fn clear(&self, user_id: Uuid) -> Result<u64>;
}

/// 购买记录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseRepositoryTrait: Send + Sync {
    /// 在给定乐谱中筛出用户已拥有的
    async fn owned_sheet_ids(&self, user_id: Uuid, sheet_ids: &[Uuid]) -> Result<Vec<Uuid>>;
    /// 有效购买（所属订单未退款）
    async fn find_active_purchase(&self, user_id: Uuid, sheet_id: Uuid)
    -> Result<Option<Purchase>>;
    async fn list_library(&self, user_id: Uuid) -> Result<Vec<LibraryRow>>;
}

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 在一个事务中写入订单及明细
    async fn create_order(&self, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;
    async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;
    async fn list_user_orders(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)>;
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64)>;
    async fn set_transaction_reference(&self, id: Uuid, reference: &str) -> Result<()>;
    /// 仅取消待支付订单，返回是否生效
    async fn cancel_pending(&self, id: Uuid) -> Result<bool>;
    /// 仅对待支付订单标记支付失败，返回是否生效
    async fn mark_payment_failed(&self, id: Uuid) -> Result<bool>;
}

/// 账户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;
    async fn list_cash_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CashTransaction>, i64)>;
}

/// webhook 事件记录结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRecord {
    /// 首次收到
    New,
    /// 之前收到但未处理完成，需要重新处理
    Unprocessed,
    /// 已处理完成
    Processed,
}

/// 支付事件仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentEventRepositoryTrait: Send + Sync {
    async fn record(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        event_type: &str,
        order_id: Option<Uuid>,
        payload: &serde_json::Value,
    ) -> Result<EventRecord>;
    async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;
}
