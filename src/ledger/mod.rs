//! 引用台账：编号分配、配额闸门与正文同步
//!
//! 台账是引用编号的唯一权威：编号从 1 严格递增、只追加、永不重派；
//! 同一文献不会以新编号被二次引用。正文里出现而台账没有的标记
//! 只记录异常、绝不自动补录（补录等于凭空捏造出处）。

pub mod diversity;
pub mod quota;

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::literature::LiteraturePool;
use crate::retrieval::RetrievalHit;

pub use quota::{QuotaPlan, SectionPos};

use quota::SectionKey;

/// 一次编号分配：文献 id → 引用编号，只追加
#[derive(Debug, Clone, Serialize)]
pub struct CitationAssignment {
    pub record_id: String,
    pub number: u32,
}

/// 正文与台账的对账结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// 正文与台账都有的编号
    pub matched: BTreeSet<u32>,
    /// 正文有、台账没有（异常，保留原样）
    pub missing_in_ledger: BTreeSet<u32>,
    /// 台账有、正文未用（保留，后续轮次可能重新引入）
    pub unused_in_ledger: BTreeSet<u32>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.missing_in_ledger.is_empty() && self.unused_in_ledger.is_empty()
    }
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("citation marker regex"))
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\d+\]\s*").expect("leading number regex"))
}

/// 提取文本中的全部 `[N]` 引用标记编号
pub fn citation_markers(text: &str) -> BTreeSet<u32> {
    marker_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect()
}

/// 引用台账
pub struct CitationLedger {
    pool: LiteraturePool,
    plan: QuotaPlan,
    assignments: Vec<CitationAssignment>,
    by_record: HashMap<String, u32>,
    next_number: u32,
    section_counts: HashMap<SectionKey, usize>,
    subsection_counts: HashMap<(usize, usize), usize>,
}

impl CitationLedger {
    pub fn new(pool: LiteraturePool, plan: QuotaPlan) -> Self {
        Self {
            pool,
            plan,
            assignments: Vec::new(),
            by_record: HashMap::new(),
            next_number: 1,
            section_counts: HashMap::new(),
            subsection_counts: HashMap::new(),
        }
    }

    pub fn pool(&self) -> &LiteraturePool {
        &self.pool
    }

    /// 已分配的全部编号
    pub fn numbers(&self) -> BTreeSet<u32> {
        self.assignments.iter().map(|a| a.number).collect()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// 只读访问分配记录（审计用）
    pub fn assignments(&self) -> &[CitationAssignment] {
        &self.assignments
    }

    /// 为当前位置挑选引用，返回应插入正文的编号列表
    ///
    /// 三重闸门（区域 / 二级标题 / 全局）全开时才会分配新编号，且每次调用
    /// 至多新增一个；闸门关闭或候选都已有编号时复用既有编号，绝不捏造。
    pub fn assign(&mut self, hits: &[RetrievalHit], query: &str, pos: &SectionPos) -> Vec<u32> {
        if hits.is_empty() {
            tracing::warn!(query = %query, "citation assignment requested with no candidates");
            return Vec::new();
        }

        let unassigned: Vec<RetrievalHit> = hits
            .iter()
            .copied()
            .filter(|h| {
                self.pool
                    .get(h.index)
                    .map(|r| !self.by_record.contains_key(&r.id))
                    .unwrap_or(false)
            })
            .collect();

        if self.quota_open(pos) && !unassigned.is_empty() {
            let picked = diversity::diverse_selection(&self.pool, &unassigned, 1);
            if let Some(&index) = picked.first() {
                return vec![self.commit_new(index, pos)];
            }
        }

        self.reuse_existing(hits, query)
    }

    /// 三重闸门：区域、二级标题、全局余量都必须大于 0
    fn quota_open(&self, pos: &SectionPos) -> bool {
        let section_used = self
            .section_counts
            .get(&pos.section_key())
            .copied()
            .unwrap_or(0);
        if section_used >= self.plan.section_quota(pos) {
            return false;
        }

        if let SectionPos::Chapter { chapter, subsection } = pos {
            let sub_used = self
                .subsection_counts
                .get(&(*chapter, *subsection))
                .copied()
                .unwrap_or(0);
            if sub_used >= self.plan.subsection_quota(pos) {
                return false;
            }
        }

        self.assignments.len() < self.plan.total()
    }

    /// 落账一个新编号并更新配额计数
    fn commit_new(&mut self, index: usize, pos: &SectionPos) -> u32 {
        let record_id = self
            .pool
            .get(index)
            .map(|r| r.id.clone())
            .unwrap_or_default();

        let number = self.next_number;
        self.next_number += 1;
        self.assignments.push(CitationAssignment {
            record_id: record_id.clone(),
            number,
        });
        self.by_record.insert(record_id, number);
        self.pool.mark_used(index);

        *self.section_counts.entry(pos.section_key()).or_insert(0) += 1;
        if let SectionPos::Chapter { chapter, subsection } = pos {
            *self
                .subsection_counts
                .entry((*chapter, *subsection))
                .or_insert(0) += 1;
        }

        tracing::debug!(number, "new citation committed");
        number
    }

    /// 复用既有编号：优先候选中已分配的，其次最近分配的；台账为空则放弃
    fn reuse_existing(&self, hits: &[RetrievalHit], query: &str) -> Vec<u32> {
        for hit in hits {
            if let Some(number) = self
                .pool
                .get(hit.index)
                .and_then(|r| self.by_record.get(&r.id))
            {
                tracing::debug!(number, "reusing candidate's existing citation");
                return vec![*number];
            }
        }

        match self.assignments.last() {
            Some(last) => {
                tracing::debug!(number = last.number, "reusing most recent citation");
                vec![last.number]
            }
            None => {
                tracing::warn!(query = %query, "no citation available to reuse");
                Vec::new()
            }
        }
    }

    /// 对账：扫描正文标记并与台账逐一比对；异常只报告不修复
    pub fn sync_with_text(&self, text: &str) -> SyncReport {
        let text_numbers = citation_markers(text);
        let ledger_numbers = self.numbers();

        let report = SyncReport {
            matched: text_numbers.intersection(&ledger_numbers).copied().collect(),
            missing_in_ledger: text_numbers.difference(&ledger_numbers).copied().collect(),
            unused_in_ledger: ledger_numbers.difference(&text_numbers).copied().collect(),
        };

        if !report.missing_in_ledger.is_empty() {
            tracing::warn!(
                markers = ?report.missing_in_ledger,
                "markers present in text but absent from ledger, left untouched"
            );
        }
        if !report.unused_in_ledger.is_empty() {
            tracing::info!(
                numbers = ?report.unused_in_ledger,
                "ledger entries not cited in text, retained"
            );
        }

        report
    }

    /// 渲染参考文献列表：按编号升序，逐条去掉原有行首编号后套用台账编号，空行分隔
    pub fn render_reference_list(&self) -> String {
        let entries: Vec<String> = self
            .assignments
            .iter()
            .filter_map(|a| {
                self.pool.find_by_id(&a.record_id).map(|record| {
                    let clean = leading_number_re().replace(&record.full_citation, "");
                    format!("[{}] {}", a.number, clean.trim())
                })
            })
            .collect();

        entries.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literature::parse_pool;

    const POOL: &str = "\
[1] 张三. 平台治理机制研究[J]. 管理学报, 2023.
[2] 李四. 算法问责制度[J]. 法学评论, 2022.
[3] 王五. 平台反垄断规制[J]. 法学研究, 2021.
[4] 赵六. 数据要素市场化[J]. 经济研究, 2020.
";

    fn hits(indices: &[usize]) -> Vec<RetrievalHit> {
        indices
            .iter()
            .enumerate()
            .map(|(rank, &index)| RetrievalHit {
                index,
                similarity: 1.0 - rank as f32 * 0.1,
            })
            .collect()
    }

    fn ledger_with_plan(plan: QuotaPlan) -> CitationLedger {
        CitationLedger::new(parse_pool(POOL), plan)
    }

    fn open_plan() -> QuotaPlan {
        QuotaPlan::with_uniform_chapters(25, 0.10, 3, 0.30, 0.0)
    }

    #[test]
    fn test_numbers_strictly_increasing_and_unique() {
        let mut ledger = ledger_with_plan(open_plan());
        let pos = SectionPos::Chapter { chapter: 0, subsection: 0 };

        let n1 = ledger.assign(&hits(&[0]), "平台治理", &pos);
        let n2 = ledger.assign(&hits(&[1]), "算法问责", &pos);
        assert_eq!(n1, vec![1]);
        assert_eq!(n2, vec![2]);
        assert_eq!(ledger.assignment_count(), 2);
    }

    #[test]
    fn test_same_record_never_gets_second_number() {
        let mut ledger = ledger_with_plan(open_plan());
        let pos = SectionPos::Introduction;

        let first = ledger.assign(&hits(&[0]), "平台治理", &pos);
        let second = ledger.assign(&hits(&[0]), "平台治理", &pos);
        assert_eq!(first, second);
        assert_eq!(ledger.assignment_count(), 1);
    }

    #[test]
    fn test_conclusion_never_adds_new_entry() {
        let mut ledger = ledger_with_plan(open_plan());

        // 先在引言落一条，再到结论请求引用
        let intro = ledger.assign(&hits(&[0]), "平台治理", &SectionPos::Introduction);
        assert_eq!(intro, vec![1]);

        let concl = ledger.assign(&hits(&[1, 2]), "总结", &SectionPos::Conclusion);
        assert_eq!(concl, vec![1]); // 复用既有编号
        assert_eq!(ledger.assignment_count(), 1);
    }

    #[test]
    fn test_conclusion_with_empty_ledger_returns_none() {
        let mut ledger = ledger_with_plan(open_plan());
        let added = ledger.assign(&hits(&[0]), "总结", &SectionPos::Conclusion);
        assert!(added.is_empty());
    }

    #[test]
    fn test_subsection_gate_closes_independently() {
        // 章配额 8，二级标题配额 ceil(8/3)=3
        let mut ledger = ledger_with_plan(open_plan());
        let sub0 = SectionPos::Chapter { chapter: 0, subsection: 0 };

        for i in 0..3 {
            let added = ledger.assign(&hits(&[i]), "查询", &sub0);
            assert_eq!(added.len(), 1);
        }
        // 同一二级标题第 4 次：闸门关闭，复用
        let reused = ledger.assign(&hits(&[3]), "查询", &sub0);
        assert_eq!(ledger.assignment_count(), 3);
        assert_eq!(reused.len(), 1);
        assert!(ledger.numbers().contains(&reused[0]));

        // 切到下一个二级标题：章配额仍有余量，可再分配
        let sub1 = SectionPos::Chapter { chapter: 0, subsection: 1 };
        let added = ledger.assign(&hits(&[3]), "查询", &sub1);
        assert_eq!(added, vec![4]);
    }

    #[test]
    fn test_global_gate() {
        let plan = QuotaPlan::with_uniform_chapters(2, 0.5, 1, 1.0, 0.0);
        let mut ledger = ledger_with_plan(plan);

        let sub0 = SectionPos::Chapter { chapter: 0, subsection: 0 };
        let sub1 = SectionPos::Chapter { chapter: 0, subsection: 1 };
        assert_eq!(ledger.assign(&hits(&[0]), "q", &sub0).len(), 1);
        assert_eq!(ledger.assign(&hits(&[1]), "q", &sub1).len(), 1);

        // 全局 2 条已满，换了二级标题也只能复用
        let sub2 = SectionPos::Chapter { chapter: 0, subsection: 2 };
        let reused = ledger.assign(&hits(&[2]), "q", &sub2);
        assert_eq!(ledger.assignment_count(), 2);
        assert!(!reused.is_empty());
    }

    #[test]
    fn test_empty_candidates_is_nonfatal() {
        let mut ledger = ledger_with_plan(open_plan());
        assert!(ledger.assign(&[], "q", &SectionPos::Introduction).is_empty());
    }

    #[test]
    fn test_sync_with_text_reports_all_three_sets() {
        let mut ledger = ledger_with_plan(open_plan());
        let pos = SectionPos::Chapter { chapter: 0, subsection: 0 };
        ledger.assign(&hits(&[0]), "q", &pos);
        ledger.assign(&hits(&[1]), "q", &pos);

        let report = ledger.sync_with_text("正文引用[1]与未知标记[9]。");
        assert!(report.matched.contains(&1));
        assert!(report.missing_in_ledger.contains(&9));
        assert!(report.unused_in_ledger.contains(&2));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_render_reference_list_strips_old_numbering() {
        let mut ledger = ledger_with_plan(open_plan());
        let pos = SectionPos::Chapter { chapter: 0, subsection: 0 };
        // 故意乱序引入：池内第 2 条先拿到编号 1
        ledger.assign(&hits(&[1]), "q", &pos);
        ledger.assign(&hits(&[0]), "q", &pos);

        let list = ledger.render_reference_list();
        let entries: Vec<&str> = list.split("\n\n").collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("[1] 李四."));
        assert!(entries[1].starts_with("[2] 张三."));
        // 原题录行首的 [2] / [1] 已被剥离，不会出现重复编号
        assert!(!entries[0].contains("[2]"));
    }

    #[test]
    fn test_citation_markers_extraction() {
        let markers = citation_markers("前文[1][2]，后文[12]。非标记 [abc]");
        assert_eq!(markers, BTreeSet::from([1, 2, 12]));
    }
}
