//! 请求 DTO 定义
//!
//! 请求体与查询参数统一使用 camelCase。展示币种优先取 `currency`，其次按 `locale` 推断，
//! 都没有时使用韩元。

use commerce::service::CheckoutSelection;
use commerce::{Currency, OrderStatus, PaymentMethod, SalesType, SheetFilter, SheetSort};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// 解析展示币种
pub fn resolve_currency(currency: Option<&str>, locale: Option<&str>) -> Result<Currency, ApiError> {
    if let Some(code) = currency.map(str::trim).filter(|c| !c.is_empty()) {
        return Currency::from_code(code)
            .ok_or_else(|| ApiError::Validation(format!("不支持的币种: {}", code)));
    }
    Ok(locale
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Currency::for_locale)
        .unwrap_or_default())
}

/// 仅携带语言区域/币种的查询参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleQuery {
    pub locale: Option<String>,
    pub currency: Option<String>,
}

impl LocaleQuery {
    pub fn currency(&self) -> Result<Currency, ApiError> {
        resolve_currency(self.currency.as_deref(), self.locale.as_deref())
    }
}

/// 乐谱列表查询参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetListQuery {
    /// 分类 ID
    pub category: Option<Uuid>,
    /// 标题/艺人关键字
    pub q: Option<String>,
    pub sales_type: Option<SalesType>,
    pub sort: Option<SheetSort>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub locale: Option<String>,
    pub currency: Option<String>,
}

impl SheetListQuery {
    pub fn currency(&self) -> Result<Currency, ApiError> {
        resolve_currency(self.currency.as_deref(), self.locale.as_deref())
    }

    pub fn filter(&self) -> SheetFilter {
        SheetFilter {
            category_id: self.category,
            query: self.q.clone(),
            sales_type: self.sales_type,
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(20),
        }
    }
}

/// 分页参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// 管理端订单查询
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// 加入购物车
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub sheet_id: Uuid,
}

/// 结算选择：`sheetIds` 与 `collectionId` 二选一
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 100, message = "乐谱数量需在 1-100 之间"))]
    pub sheet_ids: Option<Vec<Uuid>>,
    pub collection_id: Option<Uuid>,
    pub locale: Option<String>,
    pub currency: Option<String>,
}

impl CheckoutRequest {
    pub fn selection(&self) -> Result<CheckoutSelection, ApiError> {
        match (&self.sheet_ids, self.collection_id) {
            (Some(ids), None) => Ok(CheckoutSelection::Sheets(ids.clone())),
            (None, Some(id)) => Ok(CheckoutSelection::Collection(id)),
            (Some(_), Some(_)) => Err(ApiError::Validation(
                "sheetIds 与 collectionId 不能同时提供".to_string(),
            )),
            (None, None) => Err(ApiError::Validation(
                "需要提供 sheetIds 或 collectionId".to_string(),
            )),
        }
    }

    pub fn currency(&self) -> Result<Currency, ApiError> {
        resolve_currency(self.currency.as_deref(), self.locale.as_deref())
    }
}

/// 下单
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub selection: CheckoutRequest,
    pub payment_method: PaymentMethod,
}

/// PortOne 支付回跳确认
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PortOneVerifyRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub payment_id: String,
}

/// PayPal 捕获
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PayPalCaptureRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub paypal_order_id: String,
}

/// Dodo 支付回跳确认
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DodoVerifyRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub payment_id: String,
}

/// 积分支付
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsPaymentRequest {
    pub order_id: Uuid,
}

/// 积分充值下单
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CashChargeRequest {
    /// 充值金额（韩元），必须是配置的套餐金额之一
    #[validate(range(min = 1, max = 10_000_000))]
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub locale: Option<String>,
    pub currency: Option<String>,
}

impl CashChargeRequest {
    pub fn currency(&self) -> Result<Currency, ApiError> {
        resolve_currency(self.currency.as_deref(), self.locale.as_deref())
    }
}

/// 管理员确认转账入账
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDepositRequest {
    /// 银行流水号或备注
    #[serde(default)]
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

/// 管理员挂载乐谱文件
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachFileRequest {
    /// 存储桶内路径，如 `sheets/2026/hotel-california.pdf`
    #[validate(length(min = 1, max = 512))]
    pub pdf_path: String,
}

/// 管理员调整积分
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CashAdjustRequest {
    pub user_id: Uuid,
    /// 正数增加，负数扣减
    #[validate(range(min = -10_000_000, max = 10_000_000))]
    pub amount: i64,
    #[validate(length(min = 1, max = 200, message = "调整原因不能为空且不超过 200 字"))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_currency() {
        assert_eq!(resolve_currency(None, None).unwrap(), Currency::Krw);
        assert_eq!(resolve_currency(None, Some("ja")).unwrap(), Currency::Jpy);
        assert_eq!(resolve_currency(None, Some("en-US")).unwrap(), Currency::Usd);
        assert_eq!(resolve_currency(Some("krw"), Some("en")).unwrap(), Currency::Krw);
        assert_eq!(resolve_currency(Some(" "), Some("ko")).unwrap(), Currency::Krw);
        assert!(resolve_currency(Some("EUR"), None).is_err());
    }

    #[test]
    fn test_checkout_selection_requires_exactly_one() {
        let sheet = Uuid::new_v4();
        let request: CheckoutRequest =
            serde_json::from_value(serde_json::json!({"sheetIds": [sheet], "locale": "en"}))
                .unwrap();
        assert_eq!(request.selection().unwrap(), CheckoutSelection::Sheets(vec![sheet]));
        assert_eq!(request.currency().unwrap(), Currency::Usd);

        let both = CheckoutRequest {
            sheet_ids: Some(vec![sheet]),
            collection_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(both.selection().is_err());
        assert!(CheckoutRequest::default().selection().is_err());
    }

    #[test]
    fn test_create_order_request_flattens_selection() {
        let collection = Uuid::new_v4();
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "collectionId": collection,
            "paymentMethod": "kakaopay",
            "currency": "KRW"
        }))
        .unwrap();
        assert_eq!(request.payment_method, PaymentMethod::KakaoPay);
        assert_eq!(
            request.selection.selection().unwrap(),
            CheckoutSelection::Collection(collection)
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_sheet_list_fails_validation() {
        let request = CreateOrderRequest {
            selection: CheckoutRequest {
                sheet_ids: Some(vec![]),
                ..Default::default()
            },
            payment_method: PaymentMethod::Card,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_cash_adjust_validation() {
        let request = CashAdjustRequest {
            user_id: Uuid::new_v4(),
            amount: -5_000,
            reason: "".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("reason"));
    }

    #[test]
    fn test_sheet_list_query_filter() {
        let query = SheetListQuery {
            q: Some("hotel".into()),
            sales_type: Some(SalesType::Preorder),
            page_size: Some(50),
            ..Default::default()
        };
        let filter = query.filter();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 50);
        assert_eq!(filter.sort, SheetSort::Newest);
        assert_eq!(filter.sales_type, Some(SalesType::Preorder));
    }
}
