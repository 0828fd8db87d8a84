//! 响应 DTO 定义

use commerce::payment::PreparedPayment;
use commerce::service::{CompletionOutcome, PageResult};
use commerce::{Currency, Order, OrderStatus, PaymentMethod, PaymentStatus};
use serde::Serialize;
use sheet_shared::config::ChargePackage;
use uuid::Uuid;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "操作成功")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> From<PageResult<T>> for PageResponse<T> {
    fn from(page: PageResult<T>) -> Self {
        let total_pages = if page.page_size > 0 {
            (page.total + page.page_size - 1) / page.page_size
        } else {
            0
        };

        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

/// 结算页可用的支付方式
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMethodsDto {
    pub currency: Currency,
    /// 乐谱订单可用
    pub product_methods: Vec<PaymentMethod>,
    /// 积分充值可用
    pub cash_methods: Vec<PaymentMethod>,
    pub charge_packages: Vec<ChargePackage>,
}

/// 支付确认结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResultDto {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// 订单此前已完成，本次未重复入账
    pub duplicate: bool,
    pub purchased_sheet_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_completion_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<CompletionOutcome> for PaymentResultDto {
    fn from(outcome: CompletionOutcome) -> Self {
        let duplicate = outcome.is_duplicate();
        let (order, purchased_sheet_ids, credited, balance_after) = match outcome {
            CompletionOutcome::Completed(done) => (
                done.order,
                done.purchased_sheet_ids,
                done.credited,
                done.balance_after,
            ),
            CompletionOutcome::AlreadyCompleted(order) => (order, Vec::new(), None, None),
        };

        Self {
            order_id: order.id,
            order_number: order.order_number,
            status: order.status,
            payment_status: order.payment_status,
            duplicate,
            purchased_sheet_ids,
            credited,
            balance_after,
            expected_completion_at: order.expected_completion_at,
        }
    }
}

/// 充值下单结果：订单与前端发起支付所需参数
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashChargeDto {
    pub order: Order,
    pub payment: PreparedPayment,
}

/// 加入购物车结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddDto {
    pub sheet_id: Uuid,
    /// 之前已在购物车中时为 false
    pub added: bool,
}

/// 移出购物车结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRemoveDto {
    pub removed: u64,
}

/// webhook 应答
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAckDto {
    pub received: bool,
    pub result: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_response_total_pages() {
        let page: PageResponse<i32> = PageResult::new(vec![1, 2], 41, 1, 20).into();
        assert_eq!(page.total_pages, 3);

        let empty: PageResponse<i32> = PageResult::new(vec![], 0, 1, 20).into();
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(CartRemoveDto { removed: 2 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], "SUCCESS");
        assert_eq!(json["data"]["removed"], 2);
    }
}
