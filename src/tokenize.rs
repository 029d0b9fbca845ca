//! 中英文混合分词
//!
//! 使用 jieba-rs 对中文学术文本分词，英文按空格分词；
//! 供文献检索（Jaccard 相似度）与修改任务定位（关键词重合度）使用。

use std::collections::HashSet;
use std::sync::OnceLock;

use jieba_rs::Jieba;

/// 全局 Jieba 实例（延迟初始化）
static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn get_jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

/// 常见中文虚词（对检索与定位没有区分度，分词后过滤）
const STOPWORDS: &[&str] = &[
    "的", "了", "在", "与", "和", "是", "对", "为", "并", "等", "及", "以",
    "其", "中", "上", "下", "而", "不", "这", "该", "一种", "进行", "通过",
    "本文", "研究", "方面",
];

/// 判断字符是否为 CJK（中日韩）字符
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |   // CJK Unified Ideographs Extension A
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}'     // Katakana
    )
}

/// 判断文本是否包含 CJK 字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// 智能分词：含 CJK 时用 jieba 搜索引擎模式，纯英文按空格切分；统一小写并滤掉虚词
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let words: Vec<String> = if contains_cjk(text) {
        get_jieba()
            .cut_for_search(text, true)
            .into_iter()
            .map(|s| s.to_lowercase())
            .filter(|s| s.chars().count() > 1 || s.chars().next().map(is_cjk).unwrap_or(false))
            .collect()
    } else {
        text.split_whitespace()
            .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|s| s.len() > 1)
            .collect()
    };

    words
        .into_iter()
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// 分词并返回词集合（用于相似度计算）
pub fn tokenize_to_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard 相似度：两个词集合的交并比
pub fn jaccard_similarity(set1: &HashSet<String>, set2: &HashSet<String>) -> f32 {
    if set1.is_empty() || set2.is_empty() {
        return 0.0;
    }
    let intersection = set1.intersection(set2).count() as f32;
    let union = set1.union(set2).count() as f32;
    intersection / union
}

/// 关键词命中数：提示词在文本中出现的个数（子串匹配，兼容 jieba 切分差异）
pub fn hint_hits(text: &str, keywords: &[String]) -> usize {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && lower.contains(k.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_chinese() {
        let words = tokenize("数字经济背景下的平台治理机制");
        assert!(!words.is_empty());
        assert!(words.iter().any(|w| w.contains("治理") || w.contains("平台")));
    }

    #[test]
    fn test_tokenize_english() {
        let words = tokenize("Platform governance under digital economy");
        assert!(words.contains(&"governance".to_string()));
        assert!(!words.contains(&"a".to_string()));
    }

    #[test]
    fn test_stopwords_filtered() {
        let words = tokenize("治理的机制");
        assert!(!words.contains(&"的".to_string()));
    }

    #[test]
    fn test_jaccard() {
        let a = tokenize_to_set("平台治理机制分析");
        let b = tokenize_to_set("平台治理路径探讨");
        let sim = jaccard_similarity(&a, &b);
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn test_hint_hits() {
        let keywords = vec!["治理".to_string(), "创新".to_string(), "缺席".to_string()];
        assert_eq!(hint_hits("平台治理需要制度创新", &keywords), 2);
        assert_eq!(hint_hits("毫无关联的文本", &keywords), 0);
    }
}
