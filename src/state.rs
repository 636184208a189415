use std::sync::Arc;

use weisou_backend::ai::AiTextService;
use weisou_backend::config::AppConfig;
use weisou_backend::session::SearchSession;

/// Shared server state / 服务器共享状态
pub struct AppState {
    pub config: AppConfig,
    pub session: SearchSession,
    /// None when AI assist is disabled or unconfigured / AI 未配置时为 None
    pub ai: Option<Arc<dyn AiTextService>>,
}
