//! 精修控制器
//!
//! 状态机：草稿 → 评审 → 拆解 → 补丁 → 评分 → 接受或回滚 →（循环或停止）。
//! 每轮先对当前最优文本做规划评审并执行补丁，再对变更后的文本做评分评审；
//! 分数严格高于历史最优才接受，否则回滚，被丢弃的文本不再评分。
//! 回滚后的下一轮总是重新评审最优文本（不复用上一轮的意见，避免任务
//! 定位落在已不存在的段落上）。返回的永远是历史最优文本。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::artifact::RoundArtifactStore;
use crate::error::DraftError;
use crate::ledger::CitationLedger;
use crate::patch::PatchExecutor;
use crate::plan::{RevisionTask, TaskPlanner};
use crate::review::{AxisScores, CritiqueAggregator};
use crate::structure;

/// 精修配置
#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// 最大轮数
    pub max_rounds: usize,
    /// 目标综合评分，达到即提前停止
    pub target_score: f64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            target_score: 90.0,
        }
    }
}

/// 一轮精修的快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: usize,
    /// 评分评审（针对变更后文本）的各维度小计
    pub axis_scores: AxisScores,
    pub integrated_score: f64,
    pub score_extracted: bool,
    /// 本轮任务（含已解析的目标索引）
    pub tasks: Vec<RevisionTask>,
    /// 本轮变更后的全文
    pub document: String,
    /// 是否刷新了历史最优
    pub became_best: bool,
    pub timestamp: String,
}

/// 精修最终结果
#[derive(Debug)]
pub struct RefineOutcome {
    /// 历史最优文本（绝不回归）
    pub document: String,
    pub best_score: f64,
    pub rounds: Vec<RoundResult>,
}

/// 精修控制器
pub struct RefinementController {
    critique: CritiqueAggregator,
    planner: TaskPlanner,
    patcher: PatchExecutor,
    config: RefineConfig,
    artifacts: Option<RoundArtifactStore>,
}

impl RefinementController {
    pub fn new(
        critique: CritiqueAggregator,
        planner: TaskPlanner,
        patcher: PatchExecutor,
        config: RefineConfig,
    ) -> Self {
        Self {
            critique,
            planner,
            patcher,
            config,
            artifacts: None,
        }
    }

    /// 启用轮次产物落盘
    pub fn with_artifacts(mut self, store: RoundArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// 对草稿执行迭代精修，返回历史最优文本
    pub async fn run(
        &self,
        draft: &str,
        ledger: &mut CitationLedger,
    ) -> Result<RefineOutcome, DraftError> {
        let mut best = draft.to_string();
        let mut best_score = 0.0_f64;
        let mut rounds: Vec<RoundResult> = Vec::new();

        // 入口对账：草稿自带的台账外标记先暴露出来，而不是等到首轮补丁之后
        ledger.sync_with_text(draft);

        for round in 1..=self.config.max_rounds {
            tracing::info!(round, best_score, "refinement round started");

            // 规划评审：永远针对当前最优文本
            let planning = self.critique.review(&best).await?;
            let tasks = self
                .planner
                .decompose(&best, &planning.integrated_feedback)
                .await?;

            // 补丁阶段（结构解析失败时整轮跳过修改）
            let (mutated, resolved_tasks) = self.patch_round(&best, tasks, ledger).await?;

            // 台账对账：异常只报告，绝不修复
            let sync = ledger.sync_with_text(&mutated);
            tracing::info!(
                matched = sync.matched.len(),
                missing = sync.missing_in_ledger.len(),
                unused = sync.unused_in_ledger.len(),
                "citation sync after patches"
            );

            // 评分评审：针对变更后的文本
            let scoring = self.critique.review(&mutated).await?;
            let became_best = scoring.integrated_score > best_score;

            let result = RoundResult {
                round,
                axis_scores: scoring.axis_scores,
                integrated_score: scoring.integrated_score,
                score_extracted: scoring.score_extracted,
                tasks: resolved_tasks,
                document: mutated.clone(),
                became_best,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            if let Some(store) = &self.artifacts {
                // 产物只服务审计，落盘失败不影响精修
                if let Err(e) = store.save(&result) {
                    tracing::error!(round, error = %e, "failed to save round artifact");
                }
            }
            rounds.push(result);

            if became_best {
                tracing::info!(round, score = scoring.integrated_score, "round accepted as new best");
                best = mutated;
                best_score = scoring.integrated_score;
            } else {
                // 回滚：被丢弃的文本不再评分，下一轮从最优文本重新评审
                tracing::info!(
                    round,
                    score = scoring.integrated_score,
                    best_score,
                    "round rolled back to best"
                );
            }

            if best_score >= self.config.target_score {
                tracing::info!(best_score, "target score reached, stopping");
                break;
            }
        }

        tracing::info!(
            best_score,
            rounds = rounds.len(),
            "refinement finished, returning best document"
        );
        Ok(RefineOutcome {
            document: best,
            best_score,
            rounds,
        })
    }

    /// 执行一轮补丁：解析结构、逐任务定位并修改、重组全文
    async fn patch_round(
        &self,
        document: &str,
        tasks: Vec<RevisionTask>,
        ledger: &CitationLedger,
    ) -> Result<(String, Vec<RevisionTask>), DraftError> {
        let mut tree = match structure::parse(document) {
            Ok(tree) => tree,
            Err(DraftError::ParseFailure) => {
                tracing::warn!("structure parse failed, patching disabled this round");
                return Ok((document.to_string(), tasks));
            }
            Err(e) => return Err(e),
        };

        let mut patched: HashSet<usize> = HashSet::new();
        let mut resolved: Vec<RevisionTask> = Vec::with_capacity(tasks.len());

        for mut task in tasks {
            match self.patcher.resolve_locator(&task, &tree) {
                Some(index) => {
                    task.target = Some(index);
                    self.patcher
                        .apply(&mut tree, index, &task, ledger, &mut patched)
                        .await?;
                }
                None => {
                    tracing::warn!(problem = %task.problem, "task locator failed, skipped");
                }
            }
            resolved.push(task);
        }

        Ok((tree.render(), resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::ledger::QuotaPlan;
    use crate::literature::LiteraturePool;
    use crate::llm::MockLlmClient;
    use crate::patch::PatchConfig;

    const DRAFT: &str = "\
## 一、引言

平台经济的快速发展对传统治理框架提出了系统性挑战，既有研究大多聚焦单一维度，缺乏统一的分析视角，需要新的理论整合。

## 二、理论分析

交易成本理论认为平台通过降低搜寻成本与缔约成本创造价值，而算法规制路径则强调技术与法律手段的互补，两者需要放在同一框架下考察。
";

    const REWRITE_1: &str = "交易成本理论认为平台通过降低搜寻成本与缔约成本创造价值，算法规制路径强调技术与法律互补，本文将两条线索纳入统一治理框架并展开制度分析。";
    const REWRITE_2: &str = "交易成本理论与算法规制路径在治理目标上高度一致，平台通过降低搜寻成本创造价值，法律与技术手段的互补构成统一框架的两翼。";

    fn axis() -> String {
        "## 评分\n**小计: 15.00/25**\n\n## 改进建议\n1. 深化论证\n".to_string()
    }

    fn synthesis(score: &str) -> String {
        format!("## 综合评分\n**综合评分: {}/100**\n\n## 必须修改的关键问题（优先级1）\n1. 论证不足\n", score)
    }

    fn plan_response() -> String {
        "任务: 理论部分论证不足\n要求: 补充推理环节\n定位: 交易成本 算法规制\n".to_string()
    }

    fn empty_ledger() -> CitationLedger {
        CitationLedger::new(
            LiteraturePool::default(),
            QuotaPlan::with_uniform_chapters(25, 0.1, 3, 0.3, 0.0),
        )
    }

    fn controller(llm: Arc<MockLlmClient>, max_rounds: usize) -> RefinementController {
        let patch_config = PatchConfig {
            min_chars: 40,
            ..PatchConfig::default()
        };
        RefinementController::new(
            CritiqueAggregator::new(llm.clone(), 4096),
            TaskPlanner::new(llm.clone(), 1024),
            PatchExecutor::new(llm, patch_config),
            RefineConfig {
                max_rounds,
                target_score: 90.0,
            },
        )
    }

    /// 第 1 轮变更得 62 分被接受；第 2 轮变更得 58 分被回滚，
    /// 最终返回第 1 轮文本与 62 分。
    #[tokio::test]
    async fn test_accept_then_rollback_returns_round_one_document() {
        let mut responses: Vec<String> = Vec::new();
        // 第 1 轮：规划评审（4 维度 + 整合）→ 拆解 → 补丁 → 评分评审
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("50.00"));
        responses.push(plan_response());
        responses.push(REWRITE_1.to_string());
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("62.00"));
        // 第 2 轮
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("60.00"));
        responses.push(plan_response());
        responses.push(REWRITE_2.to_string());
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("58.00"));

        let llm = Arc::new(MockLlmClient::with_responses(responses));
        let controller = controller(llm, 2);
        let mut ledger = empty_ledger();

        let outcome = controller.run(DRAFT, &mut ledger).await.unwrap();

        assert_eq!(outcome.best_score, 62.0);
        assert!(outcome.document.contains(REWRITE_1));
        assert!(!outcome.document.contains(REWRITE_2));

        assert_eq!(outcome.rounds.len(), 2);
        assert!(outcome.rounds[0].became_best);
        assert!(!outcome.rounds[1].became_best);
        // 第 2 轮的变更文本保留在轮次快照里，但不是最终结果
        assert!(outcome.rounds[1].document.contains(REWRITE_2));
        // 评分单调：最终分数不低于任何一轮的已接受分数
        assert!(outcome.best_score >= outcome.rounds[0].integrated_score);
    }

    /// 达到目标分立即停止，不再进入后续轮次
    #[tokio::test]
    async fn test_stops_at_target_score() {
        let mut responses: Vec<String> = Vec::new();
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("80.00"));
        responses.push(plan_response());
        responses.push(REWRITE_1.to_string());
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("92.00"));

        let llm = Arc::new(MockLlmClient::with_responses(responses));
        let controller = controller(llm.clone(), 5);
        let mut ledger = empty_ledger();

        let outcome = controller.run(DRAFT, &mut ledger).await.unwrap();
        assert_eq!(outcome.rounds.len(), 1);
        assert_eq!(outcome.best_score, 92.0);
        // 只消耗了第 1 轮的 12 次调用（5 规划评审 + 1 拆解 + 1 补丁 + 5 评分评审）
        assert_eq!(llm.call_count(), 12);
    }

    /// 无结构草稿：本轮禁用补丁，但评审与评分照常推进
    #[tokio::test]
    async fn test_opaque_draft_skips_patching() {
        let opaque = "这是一段没有任何标题结构的草稿文本，只能整体评审而无法分段修改。";

        let mut responses: Vec<String> = Vec::new();
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("40.00"));
        responses.push(plan_response());
        // 无补丁调用：解析失败后直接进入评分评审
        responses.extend(std::iter::repeat(axis()).take(4));
        responses.push(synthesis("45.00"));

        let llm = Arc::new(MockLlmClient::with_responses(responses));
        let controller = controller(llm, 1);
        let mut ledger = empty_ledger();

        let outcome = controller.run(opaque, &mut ledger).await.unwrap();
        assert_eq!(outcome.document, opaque);
        assert_eq!(outcome.best_score, 45.0);
        assert!(outcome.rounds[0].became_best);
    }
}
