//! 修改任务拆解
//!
//! 把主编整合意见交给生成端，要求输出受约束的行式格式，再解析为
//! 离散的原子修改任务。一条任务解析不出来时合成一条通用的
//! 「强化论证」任务，保证本轮仍有事可做。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DraftError;
use crate::llm::{generate, LlmClient};

/// 一条原子修改任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionTask {
    pub id: String,
    /// 专家指出的问题
    pub problem: String,
    /// 具体修改要求
    pub requirement: String,
    /// 定位提示关键词（映射到具体段落用）
    pub keywords: Vec<String>,
    /// 解析出的目标节点索引；None 表示尚未定位（定位失败的任务被跳过）
    pub target: Option<usize>,
}

impl RevisionTask {
    fn new(problem: String, requirement: String, keywords: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            problem,
            requirement,
            keywords,
            target: None,
        }
    }
}

const PLANNER_CONTEXT: &str = "你是论文修改任务规划专家";

fn planner_prompt(paper: &str, integrated_feedback: &str) -> String {
    format!(
        "\
你是一位论文修改任务规划专家。请根据审稿意见，把修改要求拆解为具体的、
可独立执行的修改任务列表。

约束：
- 不允许生成「删除引用」「去掉角标」类任务
- 不允许生成「制作表格」「绘制图表」类任务
- 每条任务只针对一个段落

审稿意见：
{feedback}

论文当前内容：
{paper}

输出格式（每条任务三行，严格遵守；不要输出其他内容）：

任务: <专家指出的问题>
要求: <具体修改要求>
定位: <该段落的关键词，空格分隔>
",
        feedback = integrated_feedback,
        paper = paper
    )
}

/// 解析行式任务格式：任务/要求/定位 三类行，容忍列表序号与全角冒号
pub fn parse_tasks(text: &str) -> Vec<RevisionTask> {
    let mut tasks: Vec<RevisionTask> = Vec::new();
    let mut problem: Option<String> = None;
    let mut requirement = String::new();
    let mut keywords: Vec<String> = Vec::new();

    let mut flush =
        |problem: &mut Option<String>, requirement: &mut String, keywords: &mut Vec<String>| {
            if let Some(p) = problem.take() {
                let req = if requirement.is_empty() {
                    p.clone()
                } else {
                    std::mem::take(requirement)
                };
                tasks.push(RevisionTask::new(p, req, std::mem::take(keywords)));
            }
            requirement.clear();
            keywords.clear();
        };

    for line in text.lines() {
        let line = strip_list_prefix(line.trim());
        if line.is_empty() {
            continue;
        }

        if let Some(value) = field_value(line, "任务") {
            flush(&mut problem, &mut requirement, &mut keywords);
            problem = Some(value);
        } else if let Some(value) = field_value(line, "要求") {
            requirement = value;
        } else if let Some(value) = field_value(line, "定位") {
            keywords = value
                .split([' ', '、', '，', ','])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        // 其他行（解释性文字、代码围栏等）直接忽略
    }
    flush(&mut problem, &mut requirement, &mut keywords);

    tasks.retain(|t| !t.problem.is_empty());
    tasks
}

/// 去掉「1. 」「- 」类列表前缀
fn strip_list_prefix(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', ' ']);
    match line.split_once(['.', '、']) {
        Some((head, rest)) if head.chars().all(|c| c.is_ascii_digit()) && !head.is_empty() => {
            rest.trim_start()
        }
        _ => line,
    }
}

/// 「任务: xxx」→ Some("xxx")，兼容全角冒号
fn field_value(line: &str, field: &str) -> Option<String> {
    let rest = line.strip_prefix(field)?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix([':', '：'])?;
    Some(rest.trim().to_string())
}

/// 任务规划器
pub struct TaskPlanner {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl TaskPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// 拆解整合意见为任务序列；零任务时合成通用任务兜底
    pub async fn decompose(
        &self,
        paper: &str,
        integrated_feedback: &str,
    ) -> Result<Vec<RevisionTask>, DraftError> {
        let response = generate(
            self.llm.as_ref(),
            &planner_prompt(paper, integrated_feedback),
            PLANNER_CONTEXT,
            self.max_tokens,
        )
        .await
        .map_err(|e| e.into_fatal(self.llm.provider()))?;

        let mut tasks = parse_tasks(&response);
        if tasks.is_empty() {
            tracing::warn!("no tasks parsed from planner output, synthesizing generic task");
            tasks.push(RevisionTask::new(
                "论证深度不足，核心论点的推理链条不够完整".to_string(),
                "强化论证：补充推理环节，增强段落内部的逻辑衔接".to_string(),
                vec!["论证".to_string(), "分析".to_string(), "理论".to_string()],
            ));
        }

        tracing::info!(count = tasks.len(), "revision tasks decomposed");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_blocks() {
        let text = "\
任务: 引言的问题意识不突出
要求: 重写引言第二段，明确研究缺口
定位: 引言 研究缺口 问题意识

任务: 第三章论证跳跃
要求: 补充中间推理环节
定位: 算法规制 协同
";
        let tasks = parse_tasks(text);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].problem, "引言的问题意识不突出");
        assert_eq!(tasks[0].keywords, vec!["引言", "研究缺口", "问题意识"]);
        assert!(tasks[1].requirement.contains("推理环节"));
        assert!(tasks[0].target.is_none());
    }

    #[test]
    fn test_parse_tolerates_numbering_and_noise() {
        let text = "\
以下是拆解结果：

1. 任务：段落衔接生硬
   要求：增加过渡句
   定位：衔接 过渡
";
        let tasks = parse_tasks(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].problem, "段落衔接生硬");
        assert_eq!(tasks[0].keywords, vec!["衔接", "过渡"]);
    }

    #[test]
    fn test_missing_requirement_falls_back_to_problem() {
        let tasks = parse_tasks("任务: 结论过于单薄\n定位: 结论");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].requirement, "结论过于单薄");
    }

    #[tokio::test]
    async fn test_zero_tasks_synthesizes_generic() {
        let llm = Arc::new(crate::llm::MockLlmClient::with_responses([
            "抱歉，我无法按要求输出。",
        ]));
        let planner = TaskPlanner::new(llm, 1024);
        let tasks = planner.decompose("正文", "意见").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].problem.contains("论证"));
        assert!(!tasks[0].keywords.is_empty());
    }
}
