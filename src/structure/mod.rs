//! 文档结构：扁平节点表
//!
//! 节点存放在一个按索引寻址的数组里，父子关系用整数引用表达，
//! 这样替换单个段落不会使兄弟节点的引用失效；节点索引在一轮精修内
//! 就是补丁目标的稳定句柄。

pub mod parser;

use crate::error::DraftError;

pub use parser::parse;

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// 一级标题（章）
    Heading1,
    /// 二级标题
    Heading2,
    /// 正文段落（唯一可被补丁修改的类型）
    Paragraph,
    /// 摘要 / 关键词区（不可修改的叶子）
    Abstract,
    /// 参考文献区（不可修改的叶子）
    ReferenceList,
}

/// 文档节点
#[derive(Debug, Clone)]
pub struct DocumentNode {
    pub kind: NodeKind,
    /// 标题文本（标题与特殊区有，段落为 None）
    pub title: Option<String>,
    /// 标题节点存原始标题行，段落节点存段落正文，特殊区存含标题行的整块
    pub text: String,
    /// 子节点索引（仅标题节点使用）
    pub children: Vec<usize>,
}

/// 文档树：扁平数组 + 顶层节点索引
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
    roots: Vec<usize>,
    section_count: usize,
}

impl DocumentTree {
    pub(crate) fn push_root(&mut self, node: DocumentNode) -> usize {
        let index = self.push_detached(node);
        self.roots.push(index);
        index
    }

    pub(crate) fn push_child(&mut self, parent: usize, node: DocumentNode) -> usize {
        let index = self.push_detached(node);
        self.nodes[parent].children.push(index);
        index
    }

    fn push_detached(&mut self, node: DocumentNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub(crate) fn count_section(&mut self) {
        self.section_count += 1;
    }

    pub fn node(&self, index: usize) -> Option<&DocumentNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 一级正文章节数（摘要与参考文献不计）
    pub fn section_count(&self) -> usize {
        self.section_count
    }

    /// 全部段落节点（含不可补丁的短段落）
    pub fn paragraphs(&self) -> impl Iterator<Item = (usize, &DocumentNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Paragraph)
    }

    /// 是否为合法补丁目标：正文段落、长度达标、且本身不像标题
    pub fn is_patch_eligible(&self, index: usize, min_chars: usize) -> bool {
        self.node(index)
            .map(|n| {
                n.kind == NodeKind::Paragraph
                    && n.text.chars().count() >= min_chars
                    && parser::match_heading(n.text.trim()).is_none()
            })
            .unwrap_or(false)
    }

    /// 替换段落正文；只接受 Paragraph 节点
    pub fn replace_paragraph_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DraftError> {
        match self.nodes.get_mut(index) {
            Some(node) if node.kind == NodeKind::Paragraph => {
                node.text = text.into();
                Ok(())
            }
            Some(node) => Err(DraftError::MutationValidation(format!(
                "node {} is {:?}, not a paragraph",
                index, node.kind
            ))),
            None => Err(DraftError::MutationValidation(format!(
                "node index {} out of range",
                index
            ))),
        }
    }

    /// 重组全文：按原始顺序深度优先拼接，块间以空行分隔
    pub fn render(&self) -> String {
        let mut blocks: Vec<&str> = Vec::new();
        for &root in &self.roots {
            self.collect_blocks(root, &mut blocks);
        }
        blocks.join("\n\n")
    }

    fn collect_blocks<'a>(&'a self, index: usize, blocks: &mut Vec<&'a str>) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        blocks.push(node.text.as_str());
        for &child in &node.children {
            self.collect_blocks(child, blocks);
        }
    }
}
