//! 已购乐谱与下载

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use commerce::repository::LibraryRow;
use commerce::service::DownloadLinkDto;
use tracing::info;

use super::PathId;
use crate::auth::AuthUser;
use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/purchases
pub async fn purchases(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<LibraryRow>>>> {
    let rows = state.orders.library(user.id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /api/downloads/{sheetId}
///
/// 未购买返回 403；预购乐谱文件未上传返回 409
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(sheet_id), _): PathId,
) -> Result<Json<ApiResponse<DownloadLinkDto>>> {
    let link = state.downloads.download_link(user.id, sheet_id).await?;
    info!(user_id = %user.id, sheet_id = %sheet_id, "签发下载链接");
    Ok(Json(ApiResponse::success(link)))
}
