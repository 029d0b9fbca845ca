//! 错误类型与传播策略
//!
//! 结构 / 校验类失败一律在流水线内部就地恢复（跳过任务或回退段落），
//! 保证精修流程在生成服务不稳定时仍能向前推进；
//! 只有生成服务重试耗尽会作为致命错误向调用方传播，并附带提供方身份与重试次数。

use thiserror::Error;

/// 精修流水线错误（解析、评分、定位、校验、生成、配置）
#[derive(Error, Debug)]
pub enum DraftError {
    /// 未识别到任何章节结构：整篇文档视为不可分割块，本轮禁用段落级修改
    #[error("No document structure detected")]
    ParseFailure,

    /// 所有评分识别模式均未命中（调用方以中性默认分恢复，不致命）
    #[error("Score extraction failed: all recognizer patterns exhausted")]
    ScoreExtraction,

    /// 修改任务无法定位到具体段落（任务被跳过）
    #[error("Task locator failed: {0}")]
    Locator(String),

    /// 段落修改未通过引用 / 长度校验（回退到原段落）
    #[error("Mutation validation failed: {0}")]
    MutationValidation(String),

    /// 生成服务重试耗尽，携带提供方与重试次数
    #[error("Generation provider '{provider}' failed after {attempts} attempts: {message}")]
    Generation {
        provider: String,
        attempts: usize,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
