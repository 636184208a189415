use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use state::AppState;
use weisou_backend::ai::{AiTextService, OpenAiService};
use weisou_backend::config;
use weisou_backend::session::SearchSession;
use weisou_backend::source::TweakContactSource;
use weisou_backend::storage::{SqliteKvStore, StorageService};
use weisou_backend::wechat::{WeChatManager, WeChatService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weisou_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let kv_store = SqliteKvStore::connect(&database_url).await?;
    let storage = StorageService::new(Arc::new(kv_store), app_config.search.recent_cap);

    let source = Arc::new(TweakContactSource::new(&app_config.tweak)?);
    let probe = Arc::new(WeChatManager::new(app_config.tweak.clone())?);
    let launcher = Arc::new(WeChatService::new(&app_config.tweak)?);

    // AI 只在配置齐全时启用 / AI only when fully configured
    let ai: Option<Arc<dyn AiTextService>> = if app_config.ai.enabled {
        match app_config.resolve_ai_key() {
            Some(key) => Some(Arc::new(OpenAiService::new(&app_config.ai, key)?)),
            None => {
                tracing::warn!("AI enabled but no API key configured, AI assist is off");
                None
            }
        }
    } else {
        None
    };

    let session = SearchSession::start(
        source,
        probe,
        launcher,
        ai.clone(),
        storage,
        app_config.search.clone(),
        &app_config.ai.intent_patterns,
    )
    .await;

    tracing::info!(
        "Session ready: {:?}, {} contacts",
        session.phase(),
        session.contact_count()
    );

    let state = Arc::new(AppState {
        config: app_config.clone(),
        session,
        ai,
    });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/version", get(api::server::get_version_info))
        .route("/api/env/status", get(api::env::get_status))
        .route("/api/env/recheck", post(api::env::recheck))
        .route("/api/search", post(api::search::search))
        .route("/api/pins", get(api::pins::list_pins))
        .route("/api/pins/toggle", post(api::pins::toggle_pin))
        .route("/api/recents", get(api::pins::list_recents))
        .route("/api/recents/clear", post(api::pins::clear_recents))
        .route("/api/chat/start", post(api::chat::start_chat))
        .route("/api/ai/extract", post(api::ai::extract))
        .route("/api/ai/draft", post(api::ai::draft))
        .route("/api/ai/analyze", post(api::ai::analyze))
        .route("/api/session/ws", get(api::session_ws::session_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
