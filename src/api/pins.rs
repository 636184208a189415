use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use weisou_backend::models::{ContactRecord, RecentEntry};

use crate::api::ApiResponse;
use crate::state::AppState;

/// GET /api/pins - 置顶联系人列表
pub async fn list_pins(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<ContactRecord>>> {
    Json(ApiResponse::success(state.session.pinned()))
}

#[derive(Debug, Deserialize)]
pub struct TogglePinRequest {
    pub id: String,
}

/// POST /api/pins/toggle - 置顶或取消置顶
///
/// A persist failure is reported through the notification stream; the
/// returned list is the in-memory state either way. / 持久化失败走通知流，
/// 返回的始终是内存状态。
pub async fn toggle_pin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TogglePinRequest>,
) -> Json<ApiResponse<Vec<ContactRecord>>> {
    // 已置顶但已不在缓存中的联系人也要能取消置顶
    // / unpinning must work even when the contact left the cache
    let contact = state
        .session
        .find_contact(&req.id)
        .or_else(|| state.session.pinned().into_iter().find(|c| c.id == req.id));

    match contact {
        Some(contact) => {
            let pinned = state.session.toggle_pin(&contact).await;
            Json(ApiResponse::success(pinned))
        }
        None => Json(ApiResponse::error("未知联系人")),
    }
}

/// GET /api/recents - 最近联系人列表
pub async fn list_recents(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<RecentEntry>>> {
    Json(ApiResponse::success(state.session.recent()))
}

/// POST /api/recents/clear - 清除搜索历史
pub async fn clear_recents(State(state): State<Arc<AppState>>) -> Json<ApiResponse<()>> {
    state.session.clear_recent().await;
    Json(ApiResponse::success(()))
}
