use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use weisou_backend::ai;
use weisou_backend::models::DisplayModel;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    /// None when the model reports no search intent / 无搜索意图时为 None
    pub keyword: Option<String>,
    /// Results for the extracted keyword, when there is one / 关键词的搜索结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayModel>,
}

/// POST /api/ai/extract - 从会话式查询提取关键词并搜索
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Json<ApiResponse<ExtractResponse>> {
    let Some(ai_service) = state.ai.clone() else {
        return Json(ApiResponse::error("AI 未配置"));
    };

    match ai::extract_contact_keyword(ai_service.as_ref(), &req.text).await {
        Ok(Some(keyword)) => {
            let display = state.session.display_for(&keyword);
            Json(ApiResponse::success(ExtractResponse {
                keyword: Some(keyword),
                display: Some(display),
            }))
        }
        Ok(None) => Json(ApiResponse::success(ExtractResponse {
            keyword: None,
            display: None,
        })),
        Err(e) => Json(ApiResponse::error(&format!("AI 处理失败: {}", e))),
    }
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: String,
}

/// POST /api/ai/draft - 为联系人生成消息草稿
pub async fn draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DraftRequest>,
) -> Json<ApiResponse<DraftResponse>> {
    let Some(ai_service) = state.ai.clone() else {
        return Json(ApiResponse::error("AI 未配置"));
    };

    match ai::draft_message(ai_service.as_ref(), &req.title).await {
        Ok(draft) => Json(ApiResponse::success(DraftResponse { draft })),
        Err(e) => Json(ApiResponse::error(&format!("生成消息失败: {}", e))),
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub contact_count: usize,
}

/// POST /api/ai/analyze - 联系人情况分析
pub async fn analyze(State(state): State<Arc<AppState>>) -> Json<ApiResponse<AnalyzeResponse>> {
    let Some(ai_service) = state.ai.clone() else {
        return Json(ApiResponse::error("AI 未配置"));
    };

    let titles = state.session.contact_titles();
    if titles.is_empty() {
        return Json(ApiResponse::error("没有可分析的联系人"));
    }

    match ai::analyze_contacts(ai_service.as_ref(), &titles).await {
        Ok(analysis) => Json(ApiResponse::success(AnalyzeResponse {
            analysis,
            contact_count: titles.len(),
        })),
        Err(e) => Json(ApiResponse::error(&format!("AI 处理失败: {}", e))),
    }
}
