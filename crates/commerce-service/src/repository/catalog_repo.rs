//! 目录仓储
//!
//! 分类、乐谱、合集的数据访问

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::CatalogRepositoryTrait;
use crate::error::Result;
use crate::models::{Category, Collection, DrumSheet, SalesType, SheetFilter};

const SHEET_COLUMNS: &str = r#"
    id, title, artist, category_id, difficulty, price, sales_type, pdf_path,
    preview_image_url, thumbnail_url, youtube_url, page_count, is_active,
    created_at, updated_at
"#;

/// 目录仓储
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, sort_order
            FROM categories
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn list_sheets(&self, filter: &SheetFilter) -> Result<(Vec<DrumSheet>, i64)> {
        let pattern = filter.query.as_ref().map(|q| format!("%{}%", q));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM drum_sheets
            WHERE is_active = true
              AND ($1::uuid IS NULL OR category_id = $1)
              AND ($2::text IS NULL OR title ILIKE $2 OR artist ILIKE $2)
              AND ($3::text IS NULL OR sales_type = $3)
            "#,
        )
        .bind(filter.category_id)
        .bind(&pattern)
        .bind(filter.sales_type)
        .fetch_one(&self.pool)
        .await?;

        // ORDER BY 来自枚举的固定片段
        let sql = format!(
            r#"
            SELECT {SHEET_COLUMNS}
            FROM drum_sheets
            WHERE is_active = true
              AND ($1::uuid IS NULL OR category_id = $1)
              AND ($2::text IS NULL OR title ILIKE $2 OR artist ILIKE $2)
              AND ($3::text IS NULL OR sales_type = $3)
            ORDER BY {}
            LIMIT $4 OFFSET $5
            "#,
            filter.sort.order_by()
        );

        let sheets = sqlx::query_as::<_, DrumSheet>(&sql)
            .bind(filter.category_id)
            .bind(&pattern)
            .bind(filter.sales_type)
            .bind(filter.page_size)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((sheets, total))
    }

    pub async fn get_sheet(&self, id: Uuid) -> Result<Option<DrumSheet>> {
        let sql = format!("SELECT {SHEET_COLUMNS} FROM drum_sheets WHERE id = $1");
        let sheet = sqlx::query_as::<_, DrumSheet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sheet)
    }

    pub async fn get_sheets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DrumSheet>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {SHEET_COLUMNS} FROM drum_sheets WHERE id = ANY($1)");
        let sheets = sqlx::query_as::<_, DrumSheet>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(sheets)
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, title, description, thumbnail_url, original_price, sale_price,
                   is_active, created_at, updated_at
            FROM collections
            WHERE is_active = true
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    pub async fn get_collection(&self, id: Uuid) -> Result<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, title, description, thumbnail_url, original_price, sale_price,
                   is_active, created_at, updated_at
            FROM collections
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    pub async fn list_collection_sheets(&self, collection_id: Uuid) -> Result<Vec<DrumSheet>> {
        let sheets = sqlx::query_as::<_, DrumSheet>(
            r#"
            SELECT s.id, s.title, s.artist, s.category_id, s.difficulty, s.price, s.sales_type,
                   s.pdf_path, s.preview_image_url, s.thumbnail_url, s.youtube_url, s.page_count,
                   s.is_active, s.created_at, s.updated_at
            FROM collection_sheets cs
            JOIN drum_sheets s ON s.id = cs.drum_sheet_id
            WHERE cs.collection_id = $1
            ORDER BY cs.sort_order ASC, s.title ASC
            "#,
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sheets)
    }

    /// 在事务中为乐谱挂载文件，并转为即时下载
    pub async fn attach_file_in_tx(
        conn: &mut PgConnection,
        sheet_id: Uuid,
        pdf_path: &str,
    ) -> Result<Option<DrumSheet>> {
        let sql = format!(
            r#"
            UPDATE drum_sheets
            SET pdf_path = $2, sales_type = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {SHEET_COLUMNS}
            "#
        );
        let sheet = sqlx::query_as::<_, DrumSheet>(&sql)
            .bind(sheet_id)
            .bind(pdf_path)
            .bind(SalesType::Instant)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sheet)
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.list_categories().await
    }

    async fn list_sheets(&self, filter: &SheetFilter) -> Result<(Vec<DrumSheet>, i64)> {
        self.list_sheets(filter).await
    }

    async fn get_sheet(&self, id: Uuid) -> Result<Option<DrumSheet>> {
        self.get_sheet(id).await
    }

    async fn get_sheets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<DrumSheet>> {
        self.get_sheets_by_ids(ids).await
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.list_collections().await
    }

    async fn get_collection(&self, id: Uuid) -> Result<Option<Collection>> {
        self.get_collection(id).await
    }

    async fn list_collection_sheets(&self, collection_id: Uuid) -> Result<Vec<DrumSheet>> {
        self.list_collection_sheets(collection_id).await
    }
}
