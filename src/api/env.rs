use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use weisou_backend::session::SessionPhase;
use weisou_backend::wechat::EnvironmentStatus;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnvStatusResponse {
    pub phase: SessionPhase,
    pub environment: EnvironmentStatus,
    pub contact_count: usize,
    /// Where the tweak service is expected, for remediation hints
    /// / 本地服务的期望地址，便于前端给出修复提示
    pub tweak_base: String,
}

/// GET /api/env/status - 环境状态
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<EnvStatusResponse>> {
    Json(ApiResponse::success(EnvStatusResponse {
        phase: state.session.phase(),
        environment: state.session.environment(),
        contact_count: state.session.contact_count(),
        tweak_base: state.config.tweak.base_url.clone(),
    }))
}

/// POST /api/env/recheck - 修复后重新检查并重载联系人
pub async fn recheck(State(state): State<Arc<AppState>>) -> Json<ApiResponse<EnvStatusResponse>> {
    let environment = state.session.recheck().await;
    Json(ApiResponse::success(EnvStatusResponse {
        phase: state.session.phase(),
        environment,
        contact_count: state.session.contact_count(),
        tweak_base: state.config.tweak.base_url.clone(),
    }))
}
