//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Storage configuration / 存储配置
    pub storage: StorageConfig,
    /// WeChatTweak service configuration / WeChatTweak 服务配置
    pub tweak: TweakConfig,
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
    /// AI assist configuration / AI 辅助配置
    pub ai: AiConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address; launcher traffic is local only / 监听地址，仅限本机
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Storage configuration / 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Key-value database file (relative to data_dir) / 键值库文件
    pub db_file: String,
}

/// WeChatTweak service configuration / WeChatTweak 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweakConfig {
    /// Base URL of the tweak's local HTTP service / 本地服务地址
    pub base_url: String,
    /// WeChat application bundle path / 微信应用路径
    pub app_path: String,
    /// Injected tweak dylib path / 注入动态库路径
    pub dylib_path: String,
    /// Process name checked against the process table / 进程名
    pub process_name: String,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum acceptance score; lower-scored contacts are dropped
    /// / 最低接受分数，低于该分数的联系人不进入结果
    pub score_threshold: f32,
    /// Maximum number of ranked results / 最大结果数
    pub max_results: usize,
    /// Recency log cap / 历史记录上限
    pub recent_cap: usize,
    /// Debounce quiet period in milliseconds / 防抖静默期（毫秒）
    pub debounce_ms: u64,
}

/// AI assist configuration / AI 辅助配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Master switch; everything else still works when off / 总开关
    pub enabled: bool,
    /// OpenAI-compatible API base / 接口地址
    pub api_base: String,
    /// API key; empty means read OPENAI_API_KEY from the environment / 密钥
    pub api_key: String,
    /// Model name / 模型名称
    pub model: String,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
    /// Patterns that classify an input as conversational / 会话式查询关键词
    pub intent_patterns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            tweak: TweakConfig::default(),
            search: SearchConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8640,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "weisou.db".to_string(),
        }
    }
}

impl Default for TweakConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:48065".to_string(),
            app_path: "/Applications/WeChat.app".to_string(),
            dylib_path: "/Applications/WeChat.app/Contents/MacOS/WeChatTweak.framework/WeChatTweak"
                .to_string(),
            process_name: "WeChat".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            score_threshold: 30.0,
            max_results: 50,
            recent_cap: 10,
            debounce_ms: 150,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            intent_patterns: vec![
                "搜索".to_string(),
                "查找".to_string(),
                "找".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Get the full key-value database URL / 获取键值库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.storage.data_dir).join(&self.storage.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate externally-supplied URLs / 校验外部地址
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.tweak.base_url)
            .map_err(|e| format!("Invalid tweak.base_url: {}", e))?;
        url::Url::parse(&self.ai.api_base)
            .map_err(|e| format!("Invalid ai.api_base: {}", e))?;
        if self.search.recent_cap == 0 {
            return Err("search.recent_cap must be at least 1".to_string());
        }
        Ok(())
    }

    /// Resolve the AI key, falling back to the environment / 解析AI密钥
    pub fn resolve_ai_key(&self) -> Option<String> {
        if !self.ai.api_key.is_empty() {
            return Some(self.ai.api_key.clone());
        }
        std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG
        .set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}

/// Get global configuration instance / 获取全局配置实例
pub fn get_config() -> Arc<RwLock<AppConfig>> {
    CONFIG
        .get_or_init(|| {
            let config = load_config().unwrap_or_default();
            Arc::new(RwLock::new(config))
        })
        .clone()
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    get_config().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_bind_address(), "127.0.0.1:8640");
        assert!(config.get_database_url().starts_with("sqlite:"));
    }

    #[test]
    fn test_recent_cap_must_be_positive() {
        let mut config = AppConfig::default();
        config.search.recent_cap = 0;
        assert!(config.validate().is_err());
    }
}
