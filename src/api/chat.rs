use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartChatRequest {
    pub id: String,
}

/// POST /api/chat/start - 打开会话并记录历史
pub async fn start_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartChatRequest>,
) -> Json<ApiResponse<()>> {
    let Some(contact) = state.session.find_contact(&req.id) else {
        return Json(ApiResponse::error("未知联系人"));
    };

    match state.session.launch_chat(&contact).await {
        Ok(()) => Json(ApiResponse::success(())),
        Err(e) => {
            tracing::warn!("Chat launch failed: {}", e);
            Json(ApiResponse::error(&format!("启动会话失败: {}", e)))
        }
    }
}
