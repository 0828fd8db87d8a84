//! 乐谱下载
//!
//! 校验购买记录与文件状态后签发有时效的下载链接。

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{CommerceError, Result};
use crate::repository::{CatalogRepositoryTrait, PurchaseRepositoryTrait};
use crate::service::dto::DownloadLinkDto;
use crate::storage::SheetStorage;

pub struct DownloadService<CR, PR>
where
    CR: CatalogRepositoryTrait,
    PR: PurchaseRepositoryTrait,
{
    catalog_repo: Arc<CR>,
    purchase_repo: Arc<PR>,
    storage: Arc<dyn SheetStorage>,
    url_ttl_secs: u64,
}

impl<CR, PR> DownloadService<CR, PR>
where
    CR: CatalogRepositoryTrait,
    PR: PurchaseRepositoryTrait,
{
    pub fn new(
        catalog_repo: Arc<CR>,
        purchase_repo: Arc<PR>,
        storage: Arc<dyn SheetStorage>,
        url_ttl_secs: u64,
    ) -> Self {
        Self {
            catalog_repo,
            purchase_repo,
            storage,
            url_ttl_secs,
        }
    }

    #[instrument(skip(self))]
    pub async fn download_link(&self, user_id: Uuid, sheet_id: Uuid) -> Result<DownloadLinkDto> {
        let sheet = self
            .catalog_repo
            .get_sheet(sheet_id)
            .await?
            .ok_or(CommerceError::SheetNotFound(sheet_id))?;

        self.purchase_repo
            .find_active_purchase(user_id, sheet_id)
            .await?
            .ok_or(CommerceError::NotPurchased(sheet_id))?;

        // 已下架的乐谱对购买者仍可下载
        let path = sheet
            .pdf_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(CommerceError::PreorderNotReady(sheet_id))?;

        let url = self
            .storage
            .signed_download_url(path, self.url_ttl_secs)
            .await?;
        info!(user_id = %user_id, sheet_id = %sheet_id, "签发下载链接");

        Ok(DownloadLinkDto {
            sheet_id,
            url,
            expires_in: self.url_ttl_secs,
        })
    }
}
