//! 目录查询 API（公开）

use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use commerce::service::{
    CategoryDto, CollectionDetailDto, CollectionDto, SheetDetailDto, SheetSummaryDto,
};

use super::{PathId, QueryParams};
use crate::dto::{ApiResponse, LocaleQuery, PageResponse, SheetListQuery};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// GET /api/sheets
pub async fn list_sheets(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<SheetListQuery>,
) -> Result<Json<ApiResponse<PageResponse<SheetSummaryDto>>>> {
    let currency = query.currency()?;
    let page = state.catalog.list_sheets(query.filter(), currency).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// GET /api/sheets/{id}
pub async fn get_sheet(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathId,
    WithRejection(Query(query), _): QueryParams<LocaleQuery>,
) -> Result<Json<ApiResponse<SheetDetailDto>>> {
    let sheet = state.catalog.get_sheet(id, query.currency()?).await?;
    Ok(Json(ApiResponse::success(sheet)))
}

/// GET /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<LocaleQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionDto>>>> {
    let collections = state.catalog.list_collections(query.currency()?).await?;
    Ok(Json(ApiResponse::success(collections)))
}

/// GET /api/collections/{id}
pub async fn get_collection(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathId,
    WithRejection(Query(query), _): QueryParams<LocaleQuery>,
) -> Result<Json<ApiResponse<CollectionDetailDto>>> {
    let collection = state.catalog.get_collection(id, query.currency()?).await?;
    Ok(Json(ApiResponse::success(collection)))
}
