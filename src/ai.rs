//! AI text service - intent extraction and message drafting / AI 文本服务
//!
//! The model is an opaque, possibly slow, possibly failing oracle. No retry
//! policy, no conversation state; a failure is surfaced to the user and the
//! rest of the launcher stays fully interactive. / 模型是不透明的外部服务，
//! 失败只上报，不影响其余功能。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::AiError;

/// Opaque ask(prompt) → text oracle / 不透明的问答服务
#[async_trait]
pub trait AiTextService: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, AiError>;
}

/// Sentinel the extraction prompt instructs the model to answer with when
/// the input has no contact-search intent / 无搜索意图时模型返回的哨兵
const NO_INTENT_SENTINEL: &str = "不支持的搜索内容";

/// Extract a contact keyword from a conversational query / 从会话式查询提取关键词
///
/// Returns Ok(None) when the model reports no search intent — that is a
/// normal outcome, not an error. / 无搜索意图返回 None，不算错误。
pub async fn extract_contact_keyword(
    ai: &dyn AiTextService,
    text: &str,
) -> Result<Option<String>, AiError> {
    let prompt = format!(
        "如果这个查询是在寻找一个微信联系人，请提取出联系人的名字或关键词。\n\
         查询: \"{}\"\n\
         只返回联系人名字或关键词，不要添加任何其他文字。\
         如果没有搜索意图，只返回 \"{}\"。",
        text, NO_INTENT_SENTINEL
    );

    let response = ai.ask(&prompt).await?;
    let keyword = strip_quotes(response.trim());

    if keyword.is_empty() || keyword.contains(NO_INTENT_SENTINEL) {
        return Ok(None);
    }
    Ok(Some(keyword.to_string()))
}

/// Draft a short message for a contact / 为联系人生成一条消息草稿
///
/// The draft is returned to the caller; putting it on the clipboard is the
/// frontend's concern. / 草稿返回给调用方，剪贴板由前端处理。
pub async fn draft_message(ai: &dyn AiTextService, contact_title: &str) -> Result<String, AiError> {
    let prompt = format!(
        "请为我生成一条发送给 {} 的微信消息。\n\
         生成一条自然、友好、简洁的消息。\n\
         直接给出消息内容，不要添加任何前缀或说明。",
        contact_title
    );

    let response = ai.ask(&prompt).await?;
    let draft = response.trim();
    if draft.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(draft.to_string())
}

/// Free-text analysis of the loaded contact list / 联系人情况分析
pub async fn analyze_contacts(
    ai: &dyn AiTextService,
    titles: &[String],
) -> Result<String, AiError> {
    let prompt = format!(
        "以下是我的微信联系人名称列表(共{}人):\n\n{}\n\n\
         请简要分析一下我的联系人情况，\
         例如常见姓氏、名字长度分布等。",
        titles.len(),
        titles.join("\n")
    );

    let response = ai.ask(&prompt).await?;
    let analysis = response.trim();
    if analysis.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(analysis.to_string())
}

/// 模型偶尔把答案包在引号里 / models occasionally quote their answer
fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '“' | '”' | '\''))
        .trim()
}

/// OpenAI-compatible chat-completions client / OpenAI 兼容客户端
pub struct OpenAiService {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiService {
    pub fn new(config: &AiConfig, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl AiTextService for OpenAiService {
    async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        let endpoint = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AiError::Request(format!("status {}", response.status())));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Request(format!("undecodable response: {}", e)))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canned-answer oracle / 固定应答的桩
    struct CannedAi {
        answer: String,
    }

    #[async_trait]
    impl AiTextService for CannedAi {
        async fn ask(&self, _prompt: &str) -> Result<String, AiError> {
            Ok(self.answer.clone())
        }
    }

    #[tokio::test]
    async fn test_extract_keyword() {
        let ai = CannedAi {
            answer: " 李建国 \n".to_string(),
        };
        let keyword = extract_contact_keyword(&ai, "帮我找一下李建国").await.unwrap();
        assert_eq!(keyword.as_deref(), Some("李建国"));
    }

    #[tokio::test]
    async fn test_extract_strips_quotes() {
        let ai = CannedAi {
            answer: "\"老王\"".to_string(),
        };
        let keyword = extract_contact_keyword(&ai, "搜索老王").await.unwrap();
        assert_eq!(keyword.as_deref(), Some("老王"));
    }

    #[tokio::test]
    async fn test_extract_no_intent_is_none() {
        let ai = CannedAi {
            answer: NO_INTENT_SENTINEL.to_string(),
        };
        let keyword = extract_contact_keyword(&ai, "今天天气怎么样").await.unwrap();
        assert_eq!(keyword, None);
    }

    #[tokio::test]
    async fn test_draft_message_rejects_empty() {
        let ai = CannedAi {
            answer: "   ".to_string(),
        };
        assert!(matches!(
            draft_message(&ai, "老王").await,
            Err(AiError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_analyze_contacts_passes_titles() {
        struct EchoAi;
        #[async_trait]
        impl AiTextService for EchoAi {
            async fn ask(&self, prompt: &str) -> Result<String, AiError> {
                assert!(prompt.contains("共2人"));
                assert!(prompt.contains("李建国"));
                Ok("分析结果".to_string())
            }
        }
        let titles = vec!["李建国".to_string(), "刘芳".to_string()];
        let analysis = analyze_contacts(&EchoAi, &titles).await.unwrap();
        assert_eq!(analysis, "分析结果");
    }
}
