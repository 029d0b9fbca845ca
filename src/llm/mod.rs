//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock），外加重试与限频包装

pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::{strip_think_tags, OpenAiClient, TokenUsage};
pub use retry::{ProviderCooldown, RetryConfig, RetryingLlmClient};
pub use traits::{generate, LlmClient, LlmError, Message, Role};

use crate::config::LlmSection;

/// 根据配置创建 LLM 客户端：mock 直连，其余走 OpenAI 兼容端点并套重试 / 冷却包装
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    if cfg.provider == "mock" {
        return Arc::new(MockLlmClient::new());
    }

    let inner = Arc::new(OpenAiClient::new(
        cfg.base_url.as_deref(),
        &cfg.model,
        cfg.api_key.as_deref(),
    ));

    let retry = RetryConfig {
        max_attempts: cfg.max_attempts,
        backoff_base_ms: cfg.backoff_base_ms,
        min_interval_secs: cfg.min_interval_secs,
    };

    Arc::new(RetryingLlmClient::new(inner, retry))
}
