//! 服务层数据传输对象
//!
//! 价格同时给出韩元原价与展示币种金额

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Category, Collection, Currency, DrumSheet, Order, OrderItem, PaymentMethod, SalesType,
};
use crate::pricing::{ExchangeRates, Money};

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
        }
    }
}

/// 分页参数规范化：page 从 1 开始，page_size 限制在 1..=max
pub fn normalize_page(page: Option<i64>, page_size: Option<i64>, max: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(20).clamp(1, max);
    (page, page_size)
}

pub type CategoryDto = Category;

/// 乐谱列表项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// 韩元定价
    pub price: i64,
    pub display_price: Money,
    pub sales_type: SalesType,
    /// 文件已就绪
    pub downloadable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl SheetSummaryDto {
    pub fn from_sheet(sheet: &DrumSheet, rates: &ExchangeRates, currency: Currency) -> Self {
        Self {
            id: sheet.id,
            title: sheet.title.clone(),
            artist: sheet.artist.clone(),
            category_id: sheet.category_id,
            difficulty: sheet.difficulty.clone(),
            price: sheet.price,
            display_price: rates.money(sheet.price, currency),
            sales_type: sheet.sales_type,
            downloadable: sheet.is_downloadable(),
            thumbnail_url: sheet.thumbnail_url.clone(),
        }
    }
}

/// 乐谱详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDetailDto {
    #[serde(flatten)]
    pub summary: SheetSummaryDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl SheetDetailDto {
    pub fn from_sheet(sheet: &DrumSheet, rates: &ExchangeRates, currency: Currency) -> Self {
        Self {
            summary: SheetSummaryDto::from_sheet(sheet, rates, currency),
            preview_image_url: sheet.preview_image_url.clone(),
            youtube_url: sheet.youtube_url.clone(),
            page_count: sheet.page_count,
            created_at: sheet.created_at,
        }
    }
}

/// 合集
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDto {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub original_price: Money,
    pub sale_price: Money,
    pub discount_percent: i64,
}

impl CollectionDto {
    pub fn from_collection(c: &Collection, rates: &ExchangeRates, currency: Currency) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            description: c.description.clone(),
            thumbnail_url: c.thumbnail_url.clone(),
            original_price: rates.money(c.original_price, currency),
            sale_price: rates.money(c.sale_price, currency),
            discount_percent: c.discount_percent(),
        }
    }
}

/// 合集详情（含乐谱）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDetailDto {
    #[serde(flatten)]
    pub collection: CollectionDto,
    pub sheets: Vec<SheetSummaryDto>,
}

/// 购物车行
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub sheet_id: Uuid,
    pub title: String,
    pub artist: String,
    pub price: i64,
    pub display_price: Money,
    pub sales_type: SalesType,
    pub already_owned: bool,
}

/// 购物车汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummaryDto {
    pub lines: Vec<CartLineDto>,
    /// 未拥有条目的韩元小计
    pub subtotal: i64,
    pub currency: Currency,
    pub display_total: Money,
    pub payment_methods: Vec<PaymentMethod>,
}

/// 结算选择：若干乐谱，或一个合集
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSelection {
    Sheets(Vec<Uuid>),
    Collection(Uuid),
}

/// 报价行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub sheet_id: Uuid,
    pub title: String,
    /// 成交价（韩元），合集按比例分摊
    pub price: i64,
    pub display_price: Money,
    pub sales_type: SalesType,
}

/// 结算报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub total_amount: i64,
    pub currency: Currency,
    pub display_amount: i64,
    pub display_total: Money,
    /// 因已购买而排除的乐谱
    pub skipped_owned: Vec<Uuid>,
    pub payment_methods: Vec<PaymentMethod>,
}

/// 订单详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailDto {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub display_total: Money,
}

impl OrderDetailDto {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let display_total = Money::new(order.display_amount, order.display_currency);
        Self {
            order,
            items,
            display_total,
        }
    }
}

/// 限时下载链接
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinkDto {
    pub sheet_id: Uuid,
    pub url: String,
    pub expires_in: u64,
}

/// 积分余额
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBalanceDto {
    pub user_id: Uuid,
    pub credits: i64,
    pub formatted: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_sheet;

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(None, None, 100), (1, 20));
        assert_eq!(normalize_page(Some(0), Some(500), 100), (1, 100));
        assert_eq!(normalize_page(Some(3), Some(0), 50), (3, 1));
    }

    #[test]
    fn test_sheet_summary_display_price() {
        let sheet = sample_sheet(12_000, SalesType::Instant, true);
        let dto = SheetSummaryDto::from_sheet(&sheet, &ExchangeRates::default(), Currency::Usd);
        assert_eq!(dto.price, 12_000);
        assert_eq!(dto.display_price.amount, 889);
        assert_eq!(dto.display_price.formatted, "$8.89");
        assert!(dto.downloadable);

        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("pdfPath").is_none());
        assert_eq!(json["salesType"], "INSTANT");
    }

    #[test]
    fn test_sheet_detail_flattens_summary() {
        let sheet = sample_sheet(5_000, SalesType::Preorder, false);
        let dto = SheetDetailDto::from_sheet(&sheet, &ExchangeRates::default(), Currency::Krw);
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["title"], sheet.title.as_str());
        assert_eq!(json["downloadable"], false);
        assert_eq!(json["displayPrice"]["formatted"], "₩5,000");
    }
}
