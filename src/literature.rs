//! 文献池：条目模型与纯文本题录解析
//!
//! 题录格式：`[N] 作者. 题名[J]. 刊名, 2024.`，后续非题录行视为摘要续行
//! （兼容 `摘要:` / `Abstract:` 前缀）；解析后按题名去重。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 文献条目；除 used 外字段不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureRecord {
    pub id: String,
    pub authors: String,
    pub title: String,
    pub year: String,
    pub journal: String,
    pub abstract_text: String,
    /// 完整题录（参考文献列表渲染用）
    pub full_citation: String,
    /// 是否已被正文引用
    pub used: bool,
}

impl LiteratureRecord {
    /// 第一作者：逗号 / 分号前的片段
    pub fn first_author(&self) -> &str {
        self.authors
            .split([',', '，', ';', '；'])
            .next()
            .unwrap_or(&self.authors)
            .trim()
    }

    /// 检索文本：题名 + 摘要
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// 文献池：台账持有，检索方按调用传入只读引用
#[derive(Debug, Clone, Default)]
pub struct LiteraturePool {
    records: Vec<LiteratureRecord>,
}

impl LiteraturePool {
    pub fn new(records: Vec<LiteratureRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[LiteratureRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&LiteratureRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按条目 id 查找
    pub fn find_by_id(&self, id: &str) -> Option<&LiteratureRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn mark_used(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.used = true;
        }
    }

    /// 尚未被引用的条目数
    pub fn unused_count(&self) -> usize {
        self.records.iter().filter(|r| !r.used).count()
    }
}

fn entry_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[(\d+)\]\s*").expect("entry head regex"))
}

fn doc_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 文献类型标识符，如 [J] [M] [D]
    RE.get_or_init(|| Regex::new(r"\[([A-Z])\]").expect("doc type regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(20\d{2}|19\d{2})").expect("year regex"))
}

/// 解析纯文本文献池：题录行开新条目，其余行并入当前条目摘要；最后按题名去重
pub fn parse_pool(text: &str) -> LiteraturePool {
    let mut records: Vec<LiteratureRecord> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(head) = entry_head_re().find(line) {
            let id = entry_head_re()
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            records.push(parse_citation_line(&id, line, &line[head.end()..]));
        } else if let Some(current) = records.last_mut() {
            let clean = line
                .strip_prefix("摘要:")
                .or_else(|| line.strip_prefix("摘要："))
                .or_else(|| line.strip_prefix("Abstract:"))
                .unwrap_or(line)
                .trim();
            if current.abstract_text.is_empty() {
                current.abstract_text = clean.to_string();
            } else {
                current.abstract_text.push(' ');
                current.abstract_text.push_str(clean);
            }
        }
        // 文件头部的杂讯行（没有任何条目在处理中）直接跳过
    }

    let deduped = deduplicate(records);
    tracing::info!(count = deduped.len(), "literature pool parsed");
    LiteraturePool::new(deduped)
}

/// 解析单条题录：作者（首个句点前）、题名（类型标识符前）、刊名与年份
fn parse_citation_line(id: &str, full_line: &str, content: &str) -> LiteratureRecord {
    let mut authors = "未知作者".to_string();
    let mut title = content.to_string();
    let mut journal = "未知".to_string();
    let mut year = "未知".to_string();

    if let Some((head, remainder)) = content.split_once('.') {
        authors = head.trim().to_string();
        let remainder = remainder.trim();

        if let Some(type_mark) = doc_type_re().find(remainder) {
            title = remainder[..type_mark.start()].trim().to_string();
            let source = remainder[type_mark.end()..].trim_matches(['.', ' ']);
            if let Some(journal_part) = source.split(',').next() {
                let journal_part = journal_part.trim();
                if !journal_part.is_empty() {
                    journal = journal_part.to_string();
                }
            }
            if let Some(m) = year_re().find(source) {
                year = m.as_str().to_string();
            }
        } else {
            title = remainder.to_string();
        }
    }

    LiteratureRecord {
        id: id.to_string(),
        authors,
        title,
        year,
        journal,
        abstract_text: String::new(),
        full_citation: full_line.to_string(),
        used: false,
    }
}

/// 按压缩空白后的题名去重，保留先出现者
fn deduplicate(records: Vec<LiteratureRecord>) -> Vec<LiteratureRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        let key: String = record.title.split_whitespace().collect();
        if seen.insert(key) {
            unique.push(record);
        } else {
            tracing::debug!(title = %record.title, "duplicate literature entry dropped");
        }
    }
    unique
}
