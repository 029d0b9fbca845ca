//! 结构化补丁执行器
//!
//! 一次只改一个段落；生成端输出必须通过校验才会落盘：
//! 引用标记只增不减、新增标记必须在台账有号、长度落在原文的比例窗口内。
//! 校验不通过时原段落原样保留，失败只记日志不中断流水线。
//! 同一段落一轮内只改一次，避免未经再校验的叠加编辑。

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::DraftError;
use crate::ledger::{citation_markers, CitationLedger};
use crate::llm::{generate, LlmClient};
use crate::plan::RevisionTask;
use crate::structure::DocumentTree;
use crate::tokenize;

/// 补丁执行配置
#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// 段落成为补丁目标以及输出被接受的最小字符数
    pub min_chars: usize,
    /// 定位提示词的最小命中数，低于此值视为定位失败
    pub min_keyword_overlap: usize,
    /// 输出长度与原文的比例下限
    pub length_ratio_min: f64,
    /// 输出长度与原文的比例上限
    pub length_ratio_max: f64,
    /// 单次修改调用的输出长度上限
    pub max_tokens: u32,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            min_chars: 100,
            min_keyword_overlap: 1,
            length_ratio_min: 0.5,
            length_ratio_max: 2.0,
            max_tokens: 8192,
        }
    }
}

const PATCH_CONTEXT: &str = "请根据任务要求修改论文段落";

fn patch_prompt(paragraph: &str, task: &RevisionTask) -> String {
    format!(
        "\
你是一位专业的学术论文写作AI。请针对下面的修改任务重写给定段落。

修改任务：
- 专家批评：{problem}
- 详细要求：{requirement}

要求：
1. 针对专家批评彻底解决问题；如段落逻辑无法修复，允许推倒重写，但保持核心观点不变
2. 绝对禁止删除任何文献引用标记（如[1]），必须全部保留
3. 不要引入论文其他部分的内容，只输出修改后的这一个段落
4. 输出长度与原段落相当

原段落：
{paragraph}

直接输出修改后的段落，不要任何解释。
",
        problem = task.problem,
        requirement = task.requirement,
        paragraph = paragraph
    )
}

/// 补丁执行器
pub struct PatchExecutor {
    llm: Arc<dyn LlmClient>,
    config: PatchConfig,
}

impl PatchExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, config: PatchConfig) -> Self {
        Self { llm, config }
    }

    /// 把任务映射到段落节点：已有目标优先，否则按关键词命中数挑最高分段落
    ///
    /// 标题、摘要与参考文献节点永远不是候选；命中数低于阈值视为定位失败。
    pub fn resolve_locator(&self, task: &RevisionTask, tree: &DocumentTree) -> Option<usize> {
        if let Some(index) = task.target {
            if tree.is_patch_eligible(index, self.config.min_chars) {
                return Some(index);
            }
        }

        if task.keywords.is_empty() {
            return None;
        }

        tree.paragraphs()
            .filter(|(index, _)| tree.is_patch_eligible(*index, self.config.min_chars))
            .map(|(index, node)| (index, tokenize::hint_hits(&node.text, &task.keywords)))
            .filter(|(_, hits)| *hits >= self.config.min_keyword_overlap)
            .max_by_key(|(_, hits)| *hits)
            .map(|(index, _)| index)
    }

    /// 对单个段落执行一次受校验的修改；返回是否真正落盘
    pub async fn apply(
        &self,
        tree: &mut DocumentTree,
        index: usize,
        task: &RevisionTask,
        ledger: &CitationLedger,
        patched: &mut HashSet<usize>,
    ) -> Result<bool, DraftError> {
        if patched.contains(&index) {
            tracing::debug!(index, "node already patched this round, skipping task");
            return Ok(false);
        }

        let Some(original) = tree.node(index).map(|n| n.text.clone()) else {
            tracing::warn!(index, "patch target vanished, skipping");
            return Ok(false);
        };

        let output = generate(
            self.llm.as_ref(),
            &patch_prompt(&original, task),
            PATCH_CONTEXT,
            self.config.max_tokens,
        )
        .await
        .map_err(|e| e.into_fatal(self.llm.provider()))?;

        match validate_patch(&original, &output, ledger, &self.config) {
            Ok(text) => {
                tree.replace_paragraph_text(index, text)?;
                patched.insert(index);
                tracing::info!(index, "paragraph patch committed");
                Ok(true)
            }
            Err(reason) => {
                tracing::warn!(index, %reason, "patch discarded, original kept");
                Ok(false)
            }
        }
    }
}

/// 校验一次段落修改；通过返回可落盘文本，失败返回 MutationValidation
///
/// 用原文校验原文永远通过（幂等）。
pub fn validate_patch(
    original: &str,
    candidate: &str,
    ledger: &CitationLedger,
    config: &PatchConfig,
) -> Result<String, DraftError> {
    let candidate = candidate.trim();
    let candidate_chars = candidate.chars().count();
    if candidate_chars == 0 || candidate_chars < config.min_chars {
        return Err(DraftError::MutationValidation(format!(
            "output too short: {} chars",
            candidate_chars
        )));
    }

    let original_chars = original.chars().count().max(1);
    let ratio = candidate_chars as f64 / original_chars as f64;
    if ratio < config.length_ratio_min || ratio > config.length_ratio_max {
        return Err(DraftError::MutationValidation(format!(
            "length ratio {:.2} out of bounds [{}, {}]",
            ratio, config.length_ratio_min, config.length_ratio_max
        )));
    }

    let before = citation_markers(original);
    let after = citation_markers(candidate);

    let lost: Vec<u32> = before.difference(&after).copied().collect();
    if !lost.is_empty() {
        return Err(DraftError::MutationValidation(format!(
            "citation markers lost: {:?}",
            lost
        )));
    }

    // 新增标记必须在台账有号；段落原有的未知标记照旧保留（只报告不修复）
    let ledger_numbers = ledger.numbers();
    let fabricated: Vec<u32> = after
        .difference(&before)
        .filter(|n| !ledger_numbers.contains(n))
        .copied()
        .collect();
    if !fabricated.is_empty() {
        return Err(DraftError::MutationValidation(format!(
            "markers added without ledger entry: {:?}",
            fabricated
        )));
    }

    Ok(candidate.to_string())
}
