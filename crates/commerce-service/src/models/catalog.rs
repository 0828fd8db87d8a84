//! 目录领域模型：分类、乐谱、合集

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::SalesType;

/// 乐谱分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
}

/// 鼓谱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DrumSheet {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<String>,
    /// 定价（韩元）
    pub price: i64,
    pub sales_type: SalesType,
    /// 存储桶内的 PDF 路径，预购乐谱在上传前为空
    #[serde(skip_serializing)]
    pub pdf_path: Option<String>,
    pub preview_image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub youtube_url: Option<String>,
    pub page_count: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DrumSheet {
    pub fn is_downloadable(&self) -> bool {
        self.pdf_path.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// 合集（打包售卖）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    /// 单曲定价合计（韩元）
    pub original_price: i64,
    /// 合集售价（韩元）
    pub sale_price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// 折扣百分比（0-100）
    pub fn discount_percent(&self) -> i64 {
        if self.original_price <= 0 || self.sale_price >= self.original_price {
            return 0;
        }
        (self.original_price - self.sale_price) * 100 / self.original_price
    }
}

/// 乐谱列表排序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl SheetSort {
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id",
            Self::PriceAsc => "price ASC, created_at DESC",
            Self::PriceDesc => "price DESC, created_at DESC",
            Self::Title => "title ASC, id",
        }
    }
}

/// 乐谱列表过滤条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetFilter {
    pub category_id: Option<Uuid>,
    /// 标题/艺人关键字
    pub query: Option<String>,
    pub sales_type: Option<SalesType>,
    pub sort: SheetSort,
    pub page: i64,
    pub page_size: i64,
}

impl SheetFilter {
    pub const MAX_PAGE_SIZE: i64 = 100;

    /// 规范化分页参数并生成缓存指纹
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = match self.page_size {
            n if n <= 0 => 20,
            n => n.min(Self::MAX_PAGE_SIZE),
        };
        self.query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn fingerprint(&self) -> String {
        format!(
            "c={}:q={}:t={:?}:s={:?}:p={}:n={}",
            self.category_id.map(|c| c.to_string()).unwrap_or_default(),
            self.query.as_deref().unwrap_or_default().to_lowercase(),
            self.sales_type,
            self.sort,
            self.page,
            self.page_size
        )
    }
}
