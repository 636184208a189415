//! Environment probe / 环境探测
//!
//! Four checks, evaluated in dependency order: app installed → app running →
//! patch installed → patch service answering. The first unmet requirement
//! wins; remediation happens outside this process (the user installs or
//! starts things manually). / 四项检查按依赖顺序评估，修复在进程外完成。

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::TweakConfig;

/// The requirement that failed first / 首个未满足的条件
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    AppInstalled,
    AppRunning,
    PatchInstalled,
    ServiceRunning,
}

/// Probe outcome / 探测结果
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnvironmentStatus {
    Ready,
    NotReady {
        requirement: Requirement,
        message: String,
    },
}

impl EnvironmentStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, EnvironmentStatus::Ready)
    }

    fn not_ready(requirement: Requirement, message: &str) -> Self {
        EnvironmentStatus::NotReady {
            requirement,
            message: message.to_string(),
        }
    }
}

/// Host environment checks / 宿主环境检查
///
/// A trait so the session can be exercised without a real WeChat install.
/// / 以 trait 抽象，便于离线测试。
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    fn is_app_installed(&self) -> bool;
    fn is_app_running(&self) -> bool;
    fn is_patch_installed(&self) -> bool;
    /// May fail; a failed probe counts as "not running" / 探测失败按未运行处理
    async fn is_service_running(&self) -> anyhow::Result<bool>;

    /// Full ladder; first unmet requirement wins / 按序评估，返回首个未满足项
    async fn check(&self) -> EnvironmentStatus {
        if !self.is_app_installed() {
            return EnvironmentStatus::not_ready(
                Requirement::AppInstalled,
                "WeChat is not installed",
            );
        }
        if !self.is_app_running() {
            return EnvironmentStatus::not_ready(Requirement::AppRunning, "WeChat is not running");
        }
        if !self.is_patch_installed() {
            return EnvironmentStatus::not_ready(
                Requirement::PatchInstalled,
                "WeChatTweak is not installed",
            );
        }
        match self.is_service_running().await {
            Ok(true) => EnvironmentStatus::Ready,
            Ok(false) => EnvironmentStatus::not_ready(
                Requirement::ServiceRunning,
                "WeChatTweak service is not responding",
            ),
            Err(e) => {
                tracing::warn!("Service probe failed: {}", e);
                EnvironmentStatus::not_ready(
                    Requirement::ServiceRunning,
                    "Checking WeChatTweak service failed",
                )
            }
        }
    }
}

/// Probe implementation for a real host / 真实宿主的探测实现
pub struct WeChatManager {
    config: TweakConfig,
    client: reqwest::Client,
}

impl WeChatManager {
    pub fn new(config: TweakConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl EnvironmentProbe for WeChatManager {
    fn is_app_installed(&self) -> bool {
        Path::new(&self.config.app_path).exists()
    }

    fn is_app_running(&self) -> bool {
        Command::new("pgrep")
            .arg("-x")
            .arg(&self.config.process_name)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn is_patch_installed(&self) -> bool {
        Path::new(&self.config.dylib_path).exists()
    }

    async fn is_service_running(&self) -> anyhow::Result<bool> {
        let endpoint = format!(
            "{}/wechat/search?keyword=",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self.client.get(&endpoint).send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scriptable probe / 可编排的探测桩
    struct FakeProbe {
        installed: bool,
        running: bool,
        patched: bool,
        service: anyhow::Result<bool>,
    }

    #[async_trait]
    impl EnvironmentProbe for FakeProbe {
        fn is_app_installed(&self) -> bool {
            self.installed
        }
        fn is_app_running(&self) -> bool {
            self.running
        }
        fn is_patch_installed(&self) -> bool {
            self.patched
        }
        async fn is_service_running(&self) -> anyhow::Result<bool> {
            match &self.service {
                Ok(v) => Ok(*v),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    #[tokio::test]
    async fn test_first_unmet_requirement_wins() {
        let probe = FakeProbe {
            installed: false,
            running: false,
            patched: false,
            service: Ok(false),
        };
        match probe.check().await {
            EnvironmentStatus::NotReady { requirement, .. } => {
                assert_eq!(requirement, Requirement::AppInstalled);
            }
            EnvironmentStatus::Ready => panic!("expected not ready"),
        }
    }

    #[tokio::test]
    async fn test_all_met_is_ready() {
        let probe = FakeProbe {
            installed: true,
            running: true,
            patched: true,
            service: Ok(true),
        };
        assert!(probe.check().await.is_ready());
    }

    #[tokio::test]
    async fn test_probe_failure_counts_as_not_ready() {
        let probe = FakeProbe {
            installed: true,
            running: true,
            patched: true,
            service: Err(anyhow::anyhow!("connection refused")),
        };
        match probe.check().await {
            EnvironmentStatus::NotReady { requirement, .. } => {
                assert_eq!(requirement, Requirement::ServiceRunning);
            }
            EnvironmentStatus::Ready => panic!("expected not ready"),
        }
    }
}
