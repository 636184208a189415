use serde::{Deserialize, Serialize};

/// Contact record / 联系人记录
///
/// Immutable once loaded; the canonical copy lives in the session's in-memory
/// cache and is rebuilt wholesale on every session start. / 加载后不可变，
/// 会话启动时整体重建。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    /// WeChat handle used to start a conversation / 微信 ID
    pub id: String,
    /// Display name / 显示名称
    pub title: String,
    /// Remark name, if set / 备注名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Avatar URL or local path / 头像
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Quick-access deep link / 快速访问链接
    pub url: String,
}

impl ContactRecord {
    /// Best human-readable label / 展示用名称
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if let Some(subtitle) = &self.subtitle {
            subtitle
        } else {
            &self.id
        }
    }
}

/// Which field produced the best match / 命中的字段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Title,
    Subtitle,
    Id,
}

/// How the best match was made / 命中方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchClass {
    /// Query is a literal prefix of the field / 字面前缀
    Prefix,
    /// Query appears verbatim inside the field / 字面子串
    Substring,
    /// Query characters appear in order (fuzzy) / 模糊子序列
    Subsequence,
    /// Query is a prefix of the field's full pinyin / 全拼前缀
    PinyinPrefix,
    /// Query appears inside the field's full pinyin / 全拼子串
    PinyinSubstring,
    /// Query matches the field's pinyin initials / 拼音首字母
    PinyinInitial,
}

/// Ranked search result / 排序后的搜索结果
///
/// The score is comparison-only: never persisted, never exposed outside the
/// display model. / 分数仅用于排序比较，不持久化。
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub contact: ContactRecord,
    #[serde(skip_serializing)]
    pub score: f32,
    pub matched_field: MatchField,
    pub match_class: MatchClass,
}

/// Recency log entry — a snapshot, not a reference / 历史记录条目（快照）
///
/// Stores the title/icon at time of contact so later renames don't
/// retroactively rewrite history. / 保存联系时刻的名称与头像，改名不影响历史。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentEntry {
    #[serde(flatten)]
    pub contact: ContactRecord,
    /// RFC3339 timestamp of the contact / 联系时间
    pub contacted_at: String,
}

/// Display section kind / 展示分区类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Pinned,
    Recent,
    Contacts,
}

/// One entry in the presented list / 展示列表中的一项
#[derive(Debug, Clone, Serialize)]
pub struct DisplayEntry {
    pub contact: ContactRecord,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_field: Option<MatchField>,
}

/// One section of the presented list / 展示列表的一个分区
#[derive(Debug, Clone, Serialize)]
pub struct DisplaySection {
    pub kind: SectionKind,
    pub entries: Vec<DisplayEntry>,
}

/// Ordered display model handed to the frontend / 交给前端的有序展示模型
///
/// A pure function of (pinned, recent, ranked) — see
/// [`crate::session::merge_display`]. / (置顶, 历史, 排序结果) 的纯函数。
#[derive(Debug, Clone, Serialize, Default)]
pub struct DisplayModel {
    /// The settled query this model was computed for / 本模型对应的查询
    pub query: String,
    pub sections: Vec<DisplaySection>,
    /// True while a newer query is still being resolved / 是否有更新的查询在处理中
    pub loading: bool,
}

/// Notification style, mirrors the launcher's toast styles / 通知样式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStyle {
    Success,
    Failure,
    Animated,
}

/// Fire-and-forget user notification / 即发即弃的用户通知
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub style: NotificationStyle,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: NotificationStyle::Success,
            title: title.into(),
            message: Some(message.into()),
        }
    }

    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: NotificationStyle::Failure,
            title: title.into(),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_fallback() {
        let mut c = ContactRecord {
            id: "wx_abc".to_string(),
            title: "李建国".to_string(),
            subtitle: Some("老李".to_string()),
            icon: None,
            url: String::new(),
        };
        assert_eq!(c.display_title(), "李建国");
        c.title.clear();
        assert_eq!(c.display_title(), "老李");
        c.subtitle = None;
        assert_eq!(c.display_title(), "wx_abc");
    }
}
