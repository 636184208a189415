use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use weisou_backend::models::DisplayModel;
use weisou_backend::session::SessionPhase;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// POST /api/search - 一次性搜索（无状态路径）
///
/// The stateless counterpart of the WebSocket session: normalize, rank and
/// merge in one call. / WebSocket 会话的无状态对应接口。
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<ApiResponse<DisplayModel>> {
    if state.session.phase() != SessionPhase::Ready {
        return Json(ApiResponse::error("环境未就绪"));
    }

    Json(ApiResponse::success(state.session.display_for(&req.query)))
}
