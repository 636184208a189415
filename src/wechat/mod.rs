//! WeChat process/patch introspection and chat launch / 微信环境探测与会话启动
//!
//! Everything here talks to the outside world: the filesystem, the process
//! table, and the tweak's local HTTP service. The search core never touches
//! these directly. / 只有这里接触文件系统、进程表和本地服务。

pub mod manager;
pub mod service;

pub use manager::{EnvironmentProbe, EnvironmentStatus, Requirement, WeChatManager};
pub use service::{ChatLauncher, WeChatService};
