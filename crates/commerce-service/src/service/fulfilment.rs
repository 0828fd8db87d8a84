//! 预购乐谱交付
//!
//! 管理员上传文件后，乐谱转为即时下载，所有明细都已可下载的处理中订单随之完成。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sheet_shared::observability::metrics;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::catalog_service::CatalogService;
use crate::error::{CommerceError, Result};
use crate::models::DrumSheet;
use crate::repository::{CatalogRepository, CatalogRepositoryTrait, OrderRepository};

/// 文件挂载结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilmentResult {
    pub sheet: DrumSheet,
    pub completed_order_ids: Vec<Uuid>,
}

impl FulfilmentResult {
    pub fn completed_count(&self) -> usize {
        self.completed_order_ids.len()
    }
}

/// 规范化存储路径：去掉首尾空白与开头的斜杠
pub fn normalize_pdf_path(path: &str) -> Result<String> {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        return Err(CommerceError::Validation("文件路径不能为空".into()));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(CommerceError::Validation("文件路径不能包含 ..".into()));
    }
    Ok(path.to_string())
}

pub struct FulfilmentService<CR>
where
    CR: CatalogRepositoryTrait,
{
    pool: PgPool,
    catalog: Arc<CatalogService<CR>>,
}

impl<CR> FulfilmentService<CR>
where
    CR: CatalogRepositoryTrait,
{
    pub fn new(pool: PgPool, catalog: Arc<CatalogService<CR>>) -> Self {
        Self { pool, catalog }
    }

    #[instrument(skip(self))]
    pub async fn attach_sheet_file(&self, sheet_id: Uuid, pdf_path: &str) -> Result<FulfilmentResult> {
        let pdf_path = normalize_pdf_path(pdf_path)?;
        let mut tx = self.pool.begin().await?;

        let sheet = CatalogRepository::attach_file_in_tx(&mut tx, sheet_id, &pdf_path)
            .await?
            .ok_or(CommerceError::SheetNotFound(sheet_id))?;

        let orders = OrderRepository::lock_fulfillable_in_tx(&mut tx, sheet_id).await?;
        let completed_order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let completed =
            OrderRepository::complete_processing_in_tx(&mut tx, &completed_order_ids, Utc::now())
                .await?;
        tx.commit().await?;

        metrics::record_preorders_fulfilled(completed);
        info!(sheet_id = %sheet_id, completed, "预购乐谱文件已上传");

        self.catalog.invalidate().await;

        Ok(FulfilmentResult {
            sheet,
            completed_order_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pdf_path() {
        assert_eq!(
            normalize_pdf_path(" /sheets/rock/song.pdf ").unwrap(),
            "sheets/rock/song.pdf"
        );
        assert!(normalize_pdf_path("   ").is_err());
        assert!(normalize_pdf_path("/").is_err());
        assert!(normalize_pdf_path("sheets/../secret.pdf").is_err());
    }
}
