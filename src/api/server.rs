use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;

/// GET /api/health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (ranking_passes, stale_drops) = state.session.stats();
    Json(json!({
        "status": "ok",
        "message": "WeiSou 服务运行正常",
        "contacts": state.session.contact_count(),
        "ranking_passes": ranking_passes,
        "stale_drops": stale_drops,
    }))
}

/// Version information / 版本信息
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub build_time: String,
}

/// GET /api/version - 版本信息
pub async fn get_version_info() -> Json<ApiResponse<VersionInfo>> {
    Json(ApiResponse::success(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_time: env!("BUILD_TIME").to_string(),
    }))
}
