//! Conversation launcher / 会话启动
//!
//! A chat opens through the tweak service's start endpoint; failures surface
//! as notifications, never retries. / 通过本地服务开启会话，失败只通知不重试。

use async_trait::async_trait;

use crate::config::TweakConfig;
use crate::error::LaunchError;

/// Conversation launcher seam / 会话启动接口
#[async_trait]
pub trait ChatLauncher: Send + Sync {
    async fn start_chat(&self, id: &str) -> Result<(), LaunchError>;
}

/// Chat launch client / 会话启动客户端
#[derive(Clone)]
pub struct WeChatService {
    client: reqwest::Client,
    base_url: String,
}

impl WeChatService {
    pub fn new(config: &TweakConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Quick-access deep link for a contact / 联系人的快速访问链接
    pub fn quick_access_url(&self, id: &str) -> String {
        format!(
            "{}/wechat/start?session={}",
            self.base_url,
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl ChatLauncher for WeChatService {
    /// Open a conversation with the given contact / 打开与联系人的会话
    async fn start_chat(&self, id: &str) -> Result<(), LaunchError> {
        let endpoint = self.quick_access_url(id);

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| LaunchError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LaunchError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        tracing::info!("Chat started: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_access_url_encodes_identifier() {
        let service = WeChatService::new(&TweakConfig::default()).unwrap();
        assert_eq!(
            service.quick_access_url("wx_li"),
            "http://localhost:48065/wechat/start?session=wx_li"
        );
        assert_eq!(
            service.quick_access_url("gh_abc/def"),
            "http://localhost:48065/wechat/start?session=gh_abc%2Fdef"
        );
    }
}
