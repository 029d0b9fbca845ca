//! 多专家评审聚合
//!
//! 四路独立评审互不依赖，对同一份不可变文本快照并发执行（fan-out/fan-in），
//! 汇齐后再做一次主编整合；整合输出经识别器链提取 0-100 综合评分。
//! 同一提供方的限频由 LLM 层的冷却计时器负责，这里不感知。

pub mod prompts;
pub mod score;

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::error::DraftError;
use crate::llm::{generate, LlmClient, LlmError};

pub use prompts::{ReviewAxis, AXES};
pub use score::{extract_axis_score, extract_integrated_score, NEUTRAL_INTEGRATED_SCORE};

/// 四个维度的小计分数（各 0-25）
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AxisScores {
    pub innovation: f64,
    pub logic: f64,
    pub accuracy: f64,
    pub norm: f64,
}

impl AxisScores {
    pub fn sum(&self) -> f64 {
        self.innovation + self.logic + self.accuracy + self.norm
    }
}

/// 一次完整评审的结果
#[derive(Debug, Clone)]
pub struct CritiqueReport {
    pub axis_scores: AxisScores,
    /// 主编整合后的统一修改方案（任务拆解的输入）
    pub integrated_feedback: String,
    /// 0-100 综合评分
    pub integrated_score: f64,
    /// 综合评分是否由识别器成功提取（false 表示中性默认分）
    pub score_extracted: bool,
}

/// 评审聚合器
pub struct CritiqueAggregator {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl CritiqueAggregator {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// 对文本快照做一轮完整评审：四路维度评审并发，主编整合收尾
    pub async fn review(&self, paper: &str) -> Result<CritiqueReport, DraftError> {
        let axis_futures = AXES.iter().map(|axis| {
            let prompt = prompts::axis_prompt(axis, paper);
            async move {
                let feedback =
                    generate(self.llm.as_ref(), &prompt, axis.context, self.max_tokens).await?;
                Ok::<(&ReviewAxis, String), LlmError>((axis, feedback))
            }
        });

        let axis_feedback = try_join_all(axis_futures)
            .await
            .map_err(|e| e.into_fatal(self.llm.provider()))?;

        let mut scores = AxisScores::default();
        let mut named: Vec<(&str, String)> = Vec::with_capacity(axis_feedback.len());
        for (axis, feedback) in axis_feedback {
            let value = extract_axis_score(&feedback);
            tracing::info!(axis = axis.key, score = value, "axis review finished");
            match axis.key {
                "innovation" => scores.innovation = value,
                "logic" => scores.logic = value,
                "accuracy" => scores.accuracy = value,
                _ => scores.norm = value,
            }
            named.push((axis.name, feedback));
        }

        let integrated_feedback = generate(
            self.llm.as_ref(),
            &prompts::synthesis_prompt(&named),
            prompts::SYNTHESIS_CONTEXT,
            self.max_tokens,
        )
        .await
        .map_err(|e| e.into_fatal(self.llm.provider()))?;

        let (integrated_score, score_extracted) = extract_integrated_score(&integrated_feedback);
        tracing::info!(
            integrated_score,
            score_extracted,
            "critique synthesis finished"
        );

        Ok(CritiqueReport {
            axis_scores: scores,
            integrated_feedback,
            integrated_score,
            score_extracted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn axis_response(score: &str) -> String {
        format!("## 评分\n**小计: {}/25**\n\n## 改进建议\n1. 深化论证\n", score)
    }

    #[tokio::test]
    async fn test_review_aggregates_axis_and_synthesis() {
        // 四路维度评审并发执行但响应内容相同，顺序无关
        let mut responses: Vec<String> = vec![axis_response("18.00"); 4];
        responses.push("## 综合评分\n**综合评分: 72.00/100**\n\n## 必须修改的关键问题（优先级1）\n1. 论证不足".to_string());

        let llm = Arc::new(MockLlmClient::with_responses(responses));
        let aggregator = CritiqueAggregator::new(llm, 4096);

        let report = aggregator.review("## 一、引言\n\n正文。").await.unwrap();
        assert_eq!(report.axis_scores.innovation, 18.0);
        assert_eq!(report.axis_scores.sum(), 72.0);
        assert_eq!(report.integrated_score, 72.0);
        assert!(report.score_extracted);
        assert!(report.integrated_feedback.contains("论证不足"));
    }

    #[tokio::test]
    async fn test_review_neutral_default_on_unparseable_synthesis() {
        let mut responses: Vec<String> = vec![axis_response("10.00"); 4];
        responses.push("这份整合意见没有给出任何评分。".to_string());

        let llm = Arc::new(MockLlmClient::with_responses(responses));
        let aggregator = CritiqueAggregator::new(llm, 4096);

        let report = aggregator.review("正文").await.unwrap();
        assert!(!report.score_extracted);
        assert_eq!(report.integrated_score, NEUTRAL_INTEGRATED_SCORE);
    }
}
