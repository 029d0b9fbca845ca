//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete 带输出长度上限，
//! 专家评审（长输出）与段落修改（短输出）分别控制 max_tokens。

use async_trait::async_trait;
use thiserror::Error;

use crate::error::DraftError;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 对话消息
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// LLM 调用错误（按可重试性分类）
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 空输出或长度不足（由调用方视为可重试失败，而非后端错误）
    #[error("Empty or under-length output")]
    EmptyOutput,

    /// 重试包装器耗尽全部尝试后的终态错误
    #[error("Retries exhausted after {attempts} attempts: {message}")]
    Exhausted { attempts: usize, message: String },
}

impl LlmError {
    /// 连接 / 限流 / 空输出值得重试；格式错误与终态错误不重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Connectivity(_) | LlmError::RateLimited(_) | LlmError::EmptyOutput
        )
    }

    /// 转换为面向调用方的致命错误，附带提供方身份与重试次数
    pub fn into_fatal(self, provider: &str) -> DraftError {
        match self {
            LlmError::Exhausted { attempts, message } => DraftError::Generation {
                provider: provider.to_string(),
                attempts,
                message,
            },
            other => DraftError::Generation {
                provider: provider.to_string(),
                attempts: 1,
                message: other.to_string(),
            },
        }
    }
}

/// LLM 客户端 trait：带输出长度上限的非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；max_tokens 为输出长度上限
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError>;

    /// 提供方标识（错误归属与冷却计时按此区分）
    fn provider(&self) -> &str;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 便捷封装：prompt + context(system) 的一次生成调用
pub async fn generate(
    client: &dyn LlmClient,
    prompt: &str,
    context: &str,
    max_tokens: u32,
) -> Result<String, LlmError> {
    let mut messages = Vec::with_capacity(2);
    if !context.is_empty() {
        messages.push(Message::system(context));
    }
    messages.push(Message::user(prompt));
    client.complete(&messages, max_tokens).await
}
