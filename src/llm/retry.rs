//! 重试与限频包装
//!
//! RetryingLlmClient 对可重试错误做指数退避，耗尽后上报终态错误；
//! ProviderCooldown 强制同一提供方相邻两次调用之间的最小间隔，
//! 并发评审调用落到同一提供方时按到达顺序串行放行。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::llm::{LlmClient, LlmError, Message};

/// 重试配置
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 总尝试次数（含首次）
    pub max_attempts: usize,
    /// 退避基数（毫秒），按尝试次数指数递增
    pub backoff_base_ms: u64,
    /// 同一提供方相邻调用的最小间隔（秒），0 表示不限
    pub min_interval_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
            min_interval_secs: 10,
        }
    }
}

/// 同一提供方的冷却计时器
///
/// 锁在等待期间持续持有，因此并发调用方会排队，逐个间隔放行。
pub struct ProviderCooldown {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl ProviderCooldown {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// 等待直到距离上一次放行至少 min_interval，然后记录本次放行时刻
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// 重试型客户端：包装任意 LlmClient，叠加冷却与退避重试
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
    cooldown: Arc<ProviderCooldown>,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        let cooldown = Arc::new(ProviderCooldown::new(Duration::from_secs(
            config.min_interval_secs,
        )));
        Self {
            inner,
            config,
            cooldown,
        }
    }

    /// 共享已有冷却计时器（多个包装器指向同一提供方时使用）
    pub fn with_cooldown(mut self, cooldown: Arc<ProviderCooldown>) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError> {
        let mut last_err = LlmError::EmptyOutput;

        for attempt in 1..=self.config.max_attempts {
            self.cooldown.acquire().await;

            match self.inner.complete(messages, max_tokens).await {
                Ok(text) if text.trim().is_empty() => {
                    tracing::warn!(
                        provider = self.inner.provider(),
                        attempt,
                        "empty output, treating as retryable failure"
                    );
                    last_err = LlmError::EmptyOutput;
                }
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        provider = self.inner.provider(),
                        attempt,
                        error = %e,
                        "retryable generation failure"
                    );
                    last_err = e;
                }
                Err(e) => return Err(e),
            }

            if attempt < self.config.max_attempts {
                let backoff = self.config.backoff_base_ms * (1 << (attempt - 1)) as u64;
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }

        Err(LlmError::Exhausted {
            attempts: self.config.max_attempts,
            message: last_err.to_string(),
        })
    }

    fn provider(&self) -> &str {
        self.inner.provider()
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 前 N 次调用返回连接错误，之后成功
    struct FlakyClient {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn complete(&self, _m: &[Message], _t: u32) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LlmError::Connectivity("connection refused".into()))
            } else {
                Ok("ok".into())
            }
        }

        fn provider(&self) -> &str {
            "flaky"
        }
    }

    fn retry_config(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff_base_ms: 1,
            min_interval_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let inner = Arc::new(FlakyClient {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let client = RetryingLlmClient::new(inner, retry_config(3));
        let out = client.complete(&[Message::user("hi")], 64).await.unwrap();
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn test_exhausted_carries_attempts() {
        let inner = Arc::new(FlakyClient {
            failures: 10,
            calls: AtomicUsize::new(0),
        });
        let client = RetryingLlmClient::new(inner, retry_config(3));
        let err = client.complete(&[Message::user("hi")], 64).await.unwrap_err();

        let fatal = err.clone().into_fatal(client.provider());
        assert!(fatal.to_string().contains("flaky"));
        assert!(fatal.to_string().contains("3 attempts"));

        match err {
            LlmError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cooldown_spacing() {
        tokio::time::pause();
        let cooldown = ProviderCooldown::new(Duration::from_secs(10));

        let t0 = Instant::now();
        cooldown.acquire().await;
        cooldown.acquire().await;
        assert!(t0.elapsed() >= Duration::from_secs(10));
    }
}
