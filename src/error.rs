//! 失败分类 / failure taxonomy.
//!
//! Typed error enums per module seam. All variants carry a human-readable
//! detail string; every failure converts to a notification at an operation
//! boundary and none are process-fatal.

use thiserror::Error;

/// 联系人数据源错误 / contact source failures.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("contact source unavailable: {0}")]
    Unavailable(String),
}

/// 存储错误 / persistence failures for pins and recents.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage persistence failed: {0}")]
    Persistence(String),
}

/// 启动会话错误 / failures starting a WeChat chat.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("chat launcher unreachable: {0}")]
    Unreachable(String),
    #[error("chat launch rejected: {0}")]
    Rejected(String),
}

/// AI 调用错误 / AI text service failures.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("ai request failed: {0}")]
    Request(String),
    #[error("ai returned an empty response")]
    EmptyResponse,
}
