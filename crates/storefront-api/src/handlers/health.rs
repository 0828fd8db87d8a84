//! 存活与就绪探针

use axum::{Json, extract::State};
use serde_json::{Value, json};
use sheet_shared::database::Database;

use crate::state::AppState;

const SERVICE: &str = "storefront-api";

/// 存活探针：进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE
    }))
}

/// 就绪探针：检查数据库与 Redis
///
/// Redis 未启用时不参与判定
pub async fn readiness_check(State(state): State<AppState>) -> Json<Value> {
    let db_ok = Database::from_pool(state.pool.clone())
        .health_check()
        .await
        .is_ok();
    let cache_status = match &state.cache {
        Some(cache) if cache.health_check().await.is_ok() => "ok",
        Some(_) => "fail",
        None => "disabled",
    };
    let all_ok = db_ok && cache_status != "fail";

    Json(json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": SERVICE,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" },
            "redis": cache_status
        }
    }))
}
