//! 订单与已购乐谱查询

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{Order, OrderStatus};
use crate::repository::{LibraryRow, OrderRepositoryTrait, PurchaseRepositoryTrait};
use crate::service::dto::{OrderDetailDto, PageResult, normalize_page};

const MAX_PAGE_SIZE: i64 = 100;

pub struct OrderQueryService<OR, PR>
where
    OR: OrderRepositoryTrait,
    PR: PurchaseRepositoryTrait,
{
    order_repo: Arc<OR>,
    purchase_repo: Arc<PR>,
}

impl<OR, PR> OrderQueryService<OR, PR>
where
    OR: OrderRepositoryTrait,
    PR: PurchaseRepositoryTrait,
{
    pub fn new(order_repo: Arc<OR>, purchase_repo: Arc<PR>) -> Self {
        Self {
            order_repo,
            purchase_repo,
        }
    }

    /// 用户订单（新到旧）
    pub async fn list_user_orders(
        &self,
        user_id: Uuid,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<PageResult<Order>> {
        let (page, page_size) = normalize_page(page, page_size, MAX_PAGE_SIZE);
        let (items, total) = self
            .order_repo
            .list_user_orders(user_id, page_size, (page - 1) * page_size)
            .await?;
        Ok(PageResult::new(items, total, page, page_size))
    }

    /// 订单详情；非管理员只能查看自己的订单
    pub async fn order_detail(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        is_admin: bool,
    ) -> Result<OrderDetailDto> {
        let order = self
            .order_repo
            .get_order(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        if !is_admin && !order.is_owned_by(user_id) {
            return Err(CommerceError::OrderForbidden(order_id));
        }

        let items = self.order_repo.list_items(order_id).await?;
        Ok(OrderDetailDto::new(order, items))
    }

    /// 管理端订单列表
    pub async fn admin_list_orders(
        &self,
        status: Option<OrderStatus>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<PageResult<Order>> {
        let (page, page_size) = normalize_page(page, page_size, MAX_PAGE_SIZE);
        let (items, total) = self
            .order_repo
            .list_orders(status, page_size, (page - 1) * page_size)
            .await?;
        Ok(PageResult::new(items, total, page, page_size))
    }

    /// 已购乐谱
    pub async fn library(&self, user_id: Uuid) -> Result<Vec<LibraryRow>> {
        self.purchase_repo.list_library(user_id).await
    }
}
