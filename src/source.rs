//! Contact source adapter - loads contacts from the tweak service / 联系人数据源
//!
//! The companion app's injected patch exposes a local HTTP service; the full
//! contact list is fetched from it once per search session and cached in
//! memory for every keystroke. / 联系人列表每会话拉取一次，按键间复用。

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TweakConfig;
use crate::error::SourceError;
use crate::models::ContactRecord;

/// Contact list provider / 联系人列表提供者
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Load the full contact list / 加载全部联系人
    ///
    /// Fails only when the source as a whole is unreachable or unparsable;
    /// individual malformed records are skipped with a warning.
    /// / 整体不可用才报错，单条坏记录跳过。
    async fn load_contacts(&self) -> Result<Vec<ContactRecord>, SourceError>;
}

/// Raw record shape of the tweak service payload / 服务原始记录
#[derive(Debug, Deserialize)]
struct RawContact {
    /// WeChat handle — the only mandatory field / 微信 ID，唯一必填字段
    #[serde(rename = "m_nsUsrName", default)]
    usr_name: String,
    #[serde(rename = "m_nsNickName", default)]
    nick_name: String,
    #[serde(rename = "m_nsRemark", default)]
    remark: String,
    #[serde(rename = "m_nsHeadImgUrl", default)]
    head_img_url: String,
}

/// Map a raw record into a ContactRecord / 原始记录映射
///
/// Remark name takes precedence as the title (that's what the user typed),
/// with the account nickname demoted to subtitle. Records without a handle
/// are malformed. / 备注名优先作为标题，昵称降为副标题；无 ID 视为坏记录。
fn convert(raw: RawContact, base_url: &str) -> Option<ContactRecord> {
    if raw.usr_name.is_empty() {
        tracing::warn!(
            "Skipping contact without identifier (nick: {:?})",
            raw.nick_name
        );
        return None;
    }

    let (title, subtitle) = if raw.remark.is_empty() {
        (raw.nick_name, None)
    } else {
        let subtitle = if raw.nick_name.is_empty() {
            None
        } else {
            Some(raw.nick_name)
        };
        (raw.remark, subtitle)
    };

    let url = format!(
        "{}/wechat/start?session={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&raw.usr_name)
    );

    Some(ContactRecord {
        id: raw.usr_name,
        title,
        subtitle,
        icon: if raw.head_img_url.is_empty() {
            None
        } else {
            Some(raw.head_img_url)
        },
        url,
    })
}

/// Contact source backed by the tweak's local HTTP service / 基于本地服务的数据源
pub struct TweakContactSource {
    client: reqwest::Client,
    base_url: String,
}

impl TweakContactSource {
    pub fn new(config: &TweakConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContactSource for TweakContactSource {
    async fn load_contacts(&self) -> Result<Vec<ContactRecord>, SourceError> {
        // 空关键词返回全部联系人 / empty keyword returns the full list
        let endpoint = format!("{}/wechat/search?keyword=", self.base_url);

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "tweak service returned {}",
                response.status()
            )));
        }

        let raw: Vec<RawContact> = response
            .json()
            .await
            .map_err(|e| SourceError::Unavailable(format!("undecodable payload: {}", e)))?;

        let total = raw.len();
        let contacts: Vec<ContactRecord> = raw
            .into_iter()
            .filter_map(|r| convert(r, &self.base_url))
            .collect();

        if contacts.len() < total {
            tracing::warn!(
                "Skipped {} malformed contact record(s)",
                total - contacts.len()
            );
        }
        tracing::info!("Loaded {} contacts from tweak service", contacts.len());

        Ok(contacts)
    }
}

/// Fixed contact list, for tests and offline development / 静态数据源
pub struct StaticContactSource {
    contacts: Vec<ContactRecord>,
}

impl StaticContactSource {
    pub fn new(contacts: Vec<ContactRecord>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactSource for StaticContactSource {
    async fn load_contacts(&self) -> Result<Vec<ContactRecord>, SourceError> {
        Ok(self.contacts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:48065";

    #[test]
    fn test_convert_prefers_remark_as_title() {
        let raw = RawContact {
            usr_name: "wx_li".to_string(),
            nick_name: "李建国".to_string(),
            remark: "老李".to_string(),
            head_img_url: String::new(),
        };
        let c = convert(raw, BASE).unwrap();
        assert_eq!(c.title, "老李");
        assert_eq!(c.subtitle.as_deref(), Some("李建国"));
        assert_eq!(c.icon, None);
    }

    #[test]
    fn test_convert_without_remark() {
        let raw = RawContact {
            usr_name: "wx_li".to_string(),
            nick_name: "李建国".to_string(),
            remark: String::new(),
            head_img_url: "https://example.com/a.jpg".to_string(),
        };
        let c = convert(raw, BASE).unwrap();
        assert_eq!(c.title, "李建国");
        assert_eq!(c.subtitle, None);
        assert_eq!(c.icon.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[test]
    fn test_convert_skips_record_without_identifier() {
        let raw = RawContact {
            usr_name: String::new(),
            nick_name: "无名".to_string(),
            remark: String::new(),
            head_img_url: String::new(),
        };
        assert!(convert(raw, BASE).is_none());
    }

    #[test]
    fn test_deep_link_is_url_encoded() {
        let raw = RawContact {
            usr_name: "wx id/with space".to_string(),
            nick_name: "X".to_string(),
            remark: String::new(),
            head_img_url: String::new(),
        };
        let c = convert(raw, BASE).unwrap();
        assert_eq!(
            c.url,
            "http://localhost:48065/wechat/start?session=wx%20id%2Fwith%20space"
        );
    }

    #[test]
    fn test_payload_decode_skips_malformed() {
        let payload = r#"[
            {"m_nsUsrName": "wx_a", "m_nsNickName": "阿丽"},
            {"m_nsNickName": "缺ID"},
            {"m_nsUsrName": "wx_b", "m_nsNickName": "小波", "m_nsRemark": "波哥"}
        ]"#;
        let raw: Vec<RawContact> = serde_json::from_str(payload).unwrap();
        let contacts: Vec<ContactRecord> =
            raw.into_iter().filter_map(|r| convert(r, BASE)).collect();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].id, "wx_a");
        assert_eq!(contacts[1].title, "波哥");
    }
}
