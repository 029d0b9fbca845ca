//! 引用配额：区域上限与三重闸门的数值基础
//!
//! 总配额按区域占比向上取整切分；二级标题配额为所在章配额的约三分之一，
//! 随当前二级标题切换独立计数。取整产生的溢出由全局闸门兜住。

use serde::{Deserialize, Serialize};

/// 当前写作位置（配额闸门按此分区计数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionPos {
    /// 引言
    Introduction,
    /// 正文第 chapter 章、第 subsection 个二级标题（均从 0 起）
    Chapter { chapter: usize, subsection: usize },
    /// 结论（默认配额 0，不引入新引用）
    Conclusion,
}

impl SectionPos {
    /// 区域键：同一章内不同二级标题共享章配额
    pub(crate) fn section_key(&self) -> SectionKey {
        match self {
            SectionPos::Introduction => SectionKey::Introduction,
            SectionPos::Chapter { chapter, .. } => SectionKey::Chapter(*chapter),
            SectionPos::Conclusion => SectionKey::Conclusion,
        }
    }
}

/// 区域计数键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SectionKey {
    Introduction,
    Chapter(usize),
    Conclusion,
}

/// 配额方案：全局总量 + 各区域上限
#[derive(Debug, Clone)]
pub struct QuotaPlan {
    total: usize,
    introduction: usize,
    chapters: Vec<usize>,
    conclusion: usize,
    subsection_divisor: usize,
}

fn ceil_share(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).ceil() as usize
}

impl QuotaPlan {
    /// 按占比切分总配额；每个区域向上取整，超发部分由全局闸门约束
    pub fn new(
        total: usize,
        introduction_fraction: f64,
        chapter_fractions: &[f64],
        conclusion_fraction: f64,
    ) -> Self {
        Self {
            total,
            introduction: ceil_share(total, introduction_fraction),
            chapters: chapter_fractions
                .iter()
                .map(|f| ceil_share(total, *f))
                .collect(),
            conclusion: ceil_share(total, conclusion_fraction),
            subsection_divisor: 3,
        }
    }

    /// 等分的章占比便捷构造
    pub fn with_uniform_chapters(
        total: usize,
        introduction_fraction: f64,
        chapter_count: usize,
        chapter_fraction: f64,
        conclusion_fraction: f64,
    ) -> Self {
        let fractions = vec![chapter_fraction; chapter_count];
        Self::new(total, introduction_fraction, &fractions, conclusion_fraction)
    }

    /// 覆盖二级标题配额的分母（默认 3）
    pub fn with_subsection_divisor(mut self, divisor: usize) -> Self {
        self.subsection_divisor = divisor.max(1);
        self
    }

    /// 全局总配额
    pub fn total(&self) -> usize {
        self.total
    }

    /// 区域上限；计划外的章按 0 处理
    pub fn section_quota(&self, pos: &SectionPos) -> usize {
        match pos {
            SectionPos::Introduction => self.introduction,
            SectionPos::Chapter { chapter, .. } => {
                self.chapters.get(*chapter).copied().unwrap_or(0)
            }
            SectionPos::Conclusion => self.conclusion,
        }
    }

    /// 二级标题上限：所在章配额 / divisor 向上取整；引言与结论不再细分
    pub fn subsection_quota(&self, pos: &SectionPos) -> usize {
        let section = self.section_quota(pos);
        match pos {
            SectionPos::Chapter { .. } => {
                (section + self.subsection_divisor - 1) / self.subsection_divisor
            }
            _ => section,
        }
    }
}
