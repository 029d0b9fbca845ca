//! 多样性选择：优先不同作者、不同年份的候选
//!
//! 两阶段策略：第一轮贪心收取第一作者或年份尚未出现过的候选；
//! 数量不足时第二轮按相似度顺序补齐。输入要求已按相似度降序。

use std::collections::HashSet;

use crate::literature::LiteraturePool;
use crate::retrieval::RetrievalHit;

/// 从候选中挑选至多 target 条，返回池内索引
pub(crate) fn diverse_selection(
    pool: &LiteraturePool,
    hits: &[RetrievalHit],
    target: usize,
) -> Vec<usize> {
    if hits.len() <= target {
        return hits.iter().map(|h| h.index).collect();
    }

    let mut selected: Vec<usize> = Vec::with_capacity(target);
    let mut used_authors: HashSet<String> = HashSet::new();
    let mut used_years: HashSet<String> = HashSet::new();

    // 第一轮：优先多样性
    for hit in hits {
        let Some(record) = pool.get(hit.index) else {
            continue;
        };
        let author = record.first_author().to_string();
        let year = record.year.clone();

        if !used_authors.contains(&author) || !used_years.contains(&year) {
            selected.push(hit.index);
            used_authors.insert(author);
            used_years.insert(year);

            if selected.len() >= target {
                return selected;
            }
        }
    }

    // 第二轮：不足则按相似度补齐
    for hit in hits {
        if !selected.contains(&hit.index) {
            selected.push(hit.index);
            if selected.len() >= target {
                break;
            }
        }
    }

    selected
}
