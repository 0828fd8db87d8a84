//! 目录查询服务
//!
//! 分类、乐谱、合集的只读查询。结果按展示币种换算后缓存，
//! Redis 不可用时直接查库。
//!
//! ## 缓存策略
//!
//! - 分类: TTL 30 分钟
//! - 乐谱列表: TTL 2 分钟
//! - 乐谱/合集详情: TTL 10 分钟

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use sheet_shared::cache::{Cache, CacheKey};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::models::{Currency, SheetFilter};
use crate::pricing::ExchangeRates;
use crate::repository::CatalogRepositoryTrait;
use crate::service::dto::{
    CategoryDto, CollectionDetailDto, CollectionDto, PageResult, SheetDetailDto, SheetSummaryDto,
};

mod cache_ttl {
    use std::time::Duration;

    pub const CATEGORIES: Duration = Duration::from_secs(1800);
    pub const SHEET_LIST: Duration = Duration::from_secs(120);
    pub const DETAIL: Duration = Duration::from_secs(600);
}

/// 目录查询服务
pub struct CatalogService<CR>
where
    CR: CatalogRepositoryTrait,
{
    catalog_repo: Arc<CR>,
    cache: Option<Arc<Cache>>,
    rates: ExchangeRates,
}

impl<CR> CatalogService<CR>
where
    CR: CatalogRepositoryTrait,
{
    pub fn new(catalog_repo: Arc<CR>, cache: Option<Arc<Cache>>, rates: ExchangeRates) -> Self {
        Self {
            catalog_repo,
            cache,
            rates,
        }
    }

    /// 缓存优先获取，缓存读写失败只记录告警
    async fn get_cached_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(cache) = &self.cache else {
            return fetch().await;
        };

        match cache.get::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "目录缓存读取失败，回退到数据库"),
        }

        let data = fetch().await?;

        if let Err(e) = cache.set(key, &data, ttl).await {
            warn!(key = %key, error = %e, "目录缓存写入失败");
        }

        Ok(data)
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryDto>> {
        self.get_cached_or_fetch(&CacheKey::categories(), cache_ttl::CATEGORIES, || async {
            self.catalog_repo.list_categories().await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_sheets(
        &self,
        filter: SheetFilter,
        currency: Currency,
    ) -> Result<PageResult<SheetSummaryDto>> {
        let filter = filter.normalized();
        let key = CacheKey::sheet_list(&format!("{}:{}", filter.fingerprint(), currency.code()));

        self.get_cached_or_fetch(&key, cache_ttl::SHEET_LIST, || async {
            let (sheets, total) = self.catalog_repo.list_sheets(&filter).await?;
            let items = sheets
                .iter()
                .map(|s| SheetSummaryDto::from_sheet(s, &self.rates, currency))
                .collect();
            Ok(PageResult::new(items, total, filter.page, filter.page_size))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_sheet(&self, sheet_id: Uuid, currency: Currency) -> Result<SheetDetailDto> {
        let key = CacheKey::sheet_detail(&format!("{}:{}", sheet_id, currency.code()));

        self.get_cached_or_fetch(&key, cache_ttl::DETAIL, || async {
            let sheet = self
                .catalog_repo
                .get_sheet(sheet_id)
                .await?
                .filter(|s| s.is_active)
                .ok_or(CommerceError::SheetNotFound(sheet_id))?;
            Ok(SheetDetailDto::from_sheet(&sheet, &self.rates, currency))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_collections(&self, currency: Currency) -> Result<Vec<CollectionDto>> {
        let key = format!("{}:{}", CacheKey::collection_list(), currency.code());

        self.get_cached_or_fetch(&key, cache_ttl::DETAIL, || async {
            let collections = self.catalog_repo.list_collections().await?;
            Ok(collections
                .iter()
                .map(|c| CollectionDto::from_collection(c, &self.rates, currency))
                .collect())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_collection(
        &self,
        collection_id: Uuid,
        currency: Currency,
    ) -> Result<CollectionDetailDto> {
        let key = CacheKey::collection_detail(&format!("{}:{}", collection_id, currency.code()));

        self.get_cached_or_fetch(&key, cache_ttl::DETAIL, || async {
            let collection = self
                .catalog_repo
                .get_collection(collection_id)
                .await?
                .filter(|c| c.is_active)
                .ok_or(CommerceError::CollectionNotFound(collection_id))?;
            let sheets = self
                .catalog_repo
                .list_collection_sheets(collection_id)
                .await?;

            Ok(CollectionDetailDto {
                collection: CollectionDto::from_collection(&collection, &self.rates, currency),
                sheets: sheets
                    .iter()
                    .map(|s| SheetSummaryDto::from_sheet(s, &self.rates, currency))
                    .collect(),
            })
        })
        .await
    }

    /// 乐谱或合集变更后清除目录缓存
    pub async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            match cache.delete_pattern(CacheKey::CATALOG_PATTERN).await {
                Ok(deleted) => info!(deleted, "目录缓存已清除"),
                Err(e) => warn!(error = %e, "目录缓存清除失败"),
            }
        }
    }
}
