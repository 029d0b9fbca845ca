//! 结构解析：单次线性扫描识别两级标题与特殊区域
//!
//! 标题识别是一张按序匹配的规则表（井号前缀、中文序数、带括号序数等
//! 几种等价写法），先命中者生效；想支持新格式只需加一条规则。
//! 摘要 / 关键词与参考文献按标题关键字路由为不可修改的叶子区域。

use std::sync::OnceLock;

use regex::Regex;

use crate::error::DraftError;
use crate::structure::{DocumentNode, DocumentTree, NodeKind};

/// 标题层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Level1,
    Level2,
}

struct HeadingRule {
    level: HeadingLevel,
    re: Regex,
}

fn heading_rules() -> &'static [HeadingRule] {
    static RULES: OnceLock<Vec<HeadingRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |level, pattern: &str| HeadingRule {
            level,
            re: Regex::new(pattern).expect("heading rule regex"),
        };
        vec![
            // 一级标题
            rule(HeadingLevel::Level1, r"^##\s+(.+)$"),
            rule(HeadingLevel::Level1, r"^#\s+([^#].*)$"),
            rule(HeadingLevel::Level1, r"^[一二三四五六七八九十]+[、．.\s]\s*(.+)$"),
            // 二级标题
            rule(HeadingLevel::Level2, r"^###\s+(.+)$"),
            rule(HeadingLevel::Level2, r"^（[一二三四五六七八九十]+）\s*(.+)$"),
            rule(HeadingLevel::Level2, r"^\d+\s*[．.、]\s*(.+)$"),
        ]
    })
}

/// 按规则表顺序匹配标题行，返回层级与标题文本
pub fn match_heading(line: &str) -> Option<(HeadingLevel, String)> {
    for rule in heading_rules() {
        if let Some(caps) = rule.re.captures(line) {
            let title = caps.get(1).map(|m| m.as_str().trim().to_string())?;
            return Some((rule.level, title));
        }
    }
    None
}

fn is_abstract_title(title: &str) -> bool {
    ["摘要", "关键词", "Abstract", "Keywords"]
        .iter()
        .any(|k| title.contains(k))
}

fn is_reference_title(title: &str) -> bool {
    ["参考文献", "References", "Reference"]
        .iter()
        .any(|k| title.contains(k))
}

/// 解析全文为文档树；识别不到任何一级章节时返回 ParseFailure
pub fn parse(text: &str) -> Result<DocumentTree, DraftError> {
    let mut tree = DocumentTree::default();
    let mut current_h1: Option<usize> = None;
    let mut current_h2: Option<usize> = None;
    // 摘要 / 参考文献区：后续行整块并入，直到下一个一级标题
    let mut special_region: Option<usize> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        let level1 = match_heading(line.trim_end())
            .filter(|(level, _)| *level == HeadingLevel::Level1);

        if let Some((_, title)) = level1 {
            flush_paragraph(&mut tree, &mut buffer, current_h1, current_h2);
            special_region = None;
            current_h2 = None;

            if is_abstract_title(&title) {
                let index = tree.push_root(DocumentNode {
                    kind: NodeKind::Abstract,
                    title: Some(title),
                    text: line.to_string(),
                    children: Vec::new(),
                });
                special_region = Some(index);
                current_h1 = None;
            } else if is_reference_title(&title) {
                let index = tree.push_root(DocumentNode {
                    kind: NodeKind::ReferenceList,
                    title: Some(title),
                    text: line.to_string(),
                    children: Vec::new(),
                });
                special_region = Some(index);
                current_h1 = None;
            } else {
                let index = tree.push_root(DocumentNode {
                    kind: NodeKind::Heading1,
                    title: Some(title),
                    text: line.to_string(),
                    children: Vec::new(),
                });
                current_h1 = Some(index);
                tree.count_section();
            }
            continue;
        }

        if let Some(region) = special_region {
            append_to_region(&mut tree, region, line);
            continue;
        }

        if line.trim().is_empty() {
            flush_paragraph(&mut tree, &mut buffer, current_h1, current_h2);
            continue;
        }

        if let Some((HeadingLevel::Level2, title)) = match_heading(line.trim_end()) {
            if let Some(h1) = current_h1 {
                flush_paragraph(&mut tree, &mut buffer, current_h1, current_h2);
                let index = tree.push_child(
                    h1,
                    DocumentNode {
                        kind: NodeKind::Heading2,
                        title: Some(title),
                        text: line.to_string(),
                        children: Vec::new(),
                    },
                );
                current_h2 = Some(index);
                continue;
            }
        }

        buffer.push(line);
    }

    flush_paragraph(&mut tree, &mut buffer, current_h1, current_h2);

    if tree.section_count() == 0 {
        tracing::warn!("no sections detected, document treated as opaque");
        return Err(DraftError::ParseFailure);
    }

    tracing::debug!(
        sections = tree.section_count(),
        nodes = tree.len(),
        "document structure parsed"
    );
    Ok(tree)
}

/// 缓冲区落段：挂到最近的标题下，文档级前言挂顶层
fn flush_paragraph(
    tree: &mut DocumentTree,
    buffer: &mut Vec<&str>,
    current_h1: Option<usize>,
    current_h2: Option<usize>,
) {
    if buffer.is_empty() {
        return;
    }
    let text = buffer.join("\n").trim().to_string();
    buffer.clear();
    if text.is_empty() {
        return;
    }

    let node = DocumentNode {
        kind: NodeKind::Paragraph,
        title: None,
        text,
        children: Vec::new(),
    };

    match current_h2.or(current_h1) {
        Some(parent) => {
            tree.push_child(parent, node);
        }
        None => {
            tree.push_root(node);
        }
    }
}

fn append_to_region(tree: &mut DocumentTree, region: usize, line: &str) {
    if let Some(node) = tree.nodes.get_mut(region) {
        node.text.push('\n');
        node.text.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# 数字平台治理研究

## 摘要
本文研究平台治理。
关键词：平台；治理

## 一、引言

平台经济的兴起对既有治理框架提出了挑战，本文尝试给出一个统一的分析视角，并在此基础上讨论制度设计的可能空间[1]。

## 二、平台治理的理论基础

（一）交易成本视角

交易成本理论认为平台通过降低搜寻与缔约成本创造价值，治理规则的设计必须与这一成本结构相匹配[2][3]。

1. 算法规制路径

算法规制路径强调技术手段与法律手段的互补，平台内部治理与外部监管需要协同发力才能形成有效约束。

## 参考文献

[1] 张三. 平台治理机制研究[J]. 管理学报, 2023.

[2] 李四. 算法问责制度[J]. 法学评论, 2022.
";

    #[test]
    fn test_recognizes_mixed_heading_syntaxes() {
        let tree = parse(DOC).unwrap();
        assert!(tree.section_count() >= 3);

        let h2_titles: Vec<&str> = tree
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Heading2)
            .filter_map(|n| n.title.as_deref())
            .collect();
        assert!(h2_titles.contains(&"交易成本视角"));
        assert!(h2_titles.contains(&"算法规制路径"));
    }

    #[test]
    fn test_abstract_and_references_are_leaf_regions() {
        let tree = parse(DOC).unwrap();
        let abstract_node = tree
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Abstract)
            .unwrap();
        assert!(abstract_node.text.contains("关键词"));

        let refs = tree
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::ReferenceList)
            .unwrap();
        // 参考文献区整块保留，包括条目间空行
        assert!(refs.text.contains("[1] 张三"));
        assert!(refs.text.contains("\n\n[2] 李四"));
    }

    #[test]
    fn test_paragraph_attached_to_innermost_heading() {
        let tree = parse(DOC).unwrap();
        let h2_index = tree
            .nodes
            .iter()
            .position(|n| n.title.as_deref() == Some("交易成本视角"))
            .unwrap();
        let children = &tree.nodes[h2_index].children;
        assert_eq!(children.len(), 1);
        assert!(tree.nodes[children[0]].text.contains("交易成本理论"));
    }

    #[test]
    fn test_render_round_trip() {
        let tree = parse(DOC).unwrap();
        let rendered = tree.render();
        assert!(rendered.contains("## 一、引言"));
        assert!(rendered.contains("交易成本理论认为平台"));
        // 重组后再解析，结构不变
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.section_count(), tree.section_count());
        assert_eq!(reparsed.render(), rendered);
    }

    #[test]
    fn test_no_structure_is_parse_failure() {
        let err = parse("只是一段没有任何标题的文字。\n\n第二段。").unwrap_err();
        assert!(matches!(err, DraftError::ParseFailure));
    }

    #[test]
    fn test_short_or_heading_like_paragraph_not_eligible() {
        let tree = parse(DOC).unwrap();
        for (index, node) in tree.paragraphs() {
            if node.text.chars().count() < 40 {
                assert!(!tree.is_patch_eligible(index, 40));
            }
        }
        // 长段落是合法目标
        let (long_index, _) = tree
            .paragraphs()
            .find(|(_, n)| n.text.contains("交易成本理论"))
            .unwrap();
        assert!(tree.is_patch_eligible(long_index, 40));
    }

    #[test]
    fn test_heading_rule_order_first_match_wins() {
        assert_eq!(
            match_heading("## 二、平台治理"),
            Some((HeadingLevel::Level1, "二、平台治理".to_string()))
        );
        assert_eq!(
            match_heading("（三）分析框架"),
            Some((HeadingLevel::Level2, "分析框架".to_string()))
        );
        assert_eq!(match_heading("普通正文一句话。"), None);
    }
}
