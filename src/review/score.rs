//! 评分提取：按序尝试的识别器链
//!
//! 专家输出是自由文本，评分提取走一张有序策略表，先命中者生效；
//! 新的输出格式只需加一个策略，不动控制流。全链落空时返回保守的
//! 中性默认分而不是 0，返回 0 会把控制器拖进永不达标的死循环。

use std::sync::OnceLock;

use regex::Regex;

/// 所有识别模式落空时的中性默认分（0-100）
pub const NEUTRAL_INTEGRATED_SCORE: f64 = 60.0;

/// 单条识别策略
pub struct ScoreStrategy {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<f64>,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("score regex")
}

fn labeled_integrated(text: &str) -> Option<f64> {
    static CN: OnceLock<Regex> = OnceLock::new();
    static EN: OnceLock<Regex> = OnceLock::new();
    let cn = CN.get_or_init(|| re(r"综合评分[:：]\s*\**(\d+(?:\.\d+)?)\s*/\s*100"));
    let en = EN.get_or_init(|| re(r"(?i)integrated\s+score[:：]?\s*(\d+(?:\.\d+)?)\s*/\s*100"));

    cn.captures(text)
        .or_else(|| en.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn bounded_plain_number(text: &str) -> Option<f64> {
    static LABELED: OnceLock<Regex> = OnceLock::new();
    static SUFFIXED: OnceLock<Regex> = OnceLock::new();
    // 带评分语境的裸数字：「评分: 85」「score 85」或「85 分」
    let labeled = LABELED.get_or_init(|| re(r"(?i)(?:评分|得分|score)[^\d]{0,6}(\d+(?:\.\d+)?)"));
    let suffixed = SUFFIXED.get_or_init(|| re(r"(\d+(?:\.\d+)?)\s*分"));

    labeled
        .captures_iter(text)
        .chain(suffixed.captures_iter(text))
        .filter_map(|c| c.get(1))
        // 「21/25」这类按维度计分的数字不算综合分
        .filter(|m| !text[m.end()..].trim_start().starts_with('/'))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|v| (0.0..=100.0).contains(v))
}

fn arithmetic_sum(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let expr = RE.get_or_init(|| re(r"\d+(?:\.\d+)?(?:\s*[+＋]\s*\d+(?:\.\d+)?)+"));

    let matched = expr.find(text)?;
    let sum: f64 = matched
        .as_str()
        .split(['+', '＋'])
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .sum();
    (sum <= 100.0).then_some(sum)
}

fn axis_totals_sum(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let total = RE.get_or_init(|| re(r"得分[:：]\s*\**(\d+(?:\.\d+)?)\s*/\s*25"));

    let values: Vec<f64> = total
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();
    (values.len() >= 4).then(|| values[..4].iter().sum())
}

fn axis_subtotals_sum(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let subtotal = RE.get_or_init(|| re(r"小计[:：]\s*\**(\d+(?:\.\d+)?)\s*/\s*25"));

    let values: Vec<f64> = subtotal
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .take(4)
        .collect();
    (!values.is_empty()).then(|| values.iter().sum())
}

/// 综合评分识别策略表（顺序即优先级）
pub fn integrated_score_strategies() -> &'static [ScoreStrategy] {
    &[
        ScoreStrategy {
            name: "labeled_integrated",
            apply: labeled_integrated,
        },
        ScoreStrategy {
            name: "bounded_plain_number",
            apply: bounded_plain_number,
        },
        ScoreStrategy {
            name: "arithmetic_sum",
            apply: arithmetic_sum,
        },
        ScoreStrategy {
            name: "axis_totals_sum",
            apply: axis_totals_sum,
        },
        ScoreStrategy {
            name: "axis_subtotals_sum",
            apply: axis_subtotals_sum,
        },
    ]
}

/// 从整合意见中提取综合评分（0-100）；返回 (分数, 是否成功提取)
pub fn extract_integrated_score(text: &str) -> (f64, bool) {
    for strategy in integrated_score_strategies() {
        if let Some(value) = (strategy.apply)(text) {
            if (0.0..=100.0).contains(&value) {
                tracing::debug!(strategy = strategy.name, value, "integrated score extracted");
                return (value, true);
            }
        }
    }
    tracing::warn!("score extraction failed, using neutral default");
    (NEUTRAL_INTEGRATED_SCORE, false)
}

/// 从单个专家反馈中提取小计分数（0-25）
pub fn extract_axis_score(text: &str) -> f64 {
    static SUBTOTAL: OnceLock<Regex> = OnceLock::new();
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let subtotal = SUBTOTAL.get_or_init(|| re(r"小计[:：]\s*\**(\d+(?:\.\d+)?)\s*/\s*25"));
    let item = ITEM.get_or_init(|| re(r"(\d+(?:\.\d+)?)\s*/\s*6\.25"));

    if let Some(value) = subtotal
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return value;
    }

    let items: Vec<f64> = item
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();
    if !items.is_empty() {
        return items.iter().sum();
    }

    tracing::warn!("axis score extraction failed, defaulting to 0");
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_score_wins_first() {
        let text = "## 综合评分\n**综合评分: 83.50/100**\n其他数字 12 和 7";
        assert_eq!(extract_integrated_score(text), (83.5, true));
    }

    #[test]
    fn test_english_label() {
        let text = "Integrated score: 77/100 overall.";
        assert_eq!(extract_integrated_score(text), (77.0, true));
    }

    #[test]
    fn test_plain_number_fallback() {
        let text = "总体来看大约 72 分的水平。";
        assert_eq!(extract_integrated_score(text), (72.0, true));
    }

    #[test]
    fn test_arithmetic_expression() {
        // 无孤立合规数字时，算式求和兜底
        let text = "各维度 522.5 分 777.25 分，合计 22+20+19.5+21";
        let (score, extracted) = extract_integrated_score(text);
        assert!(extracted);
        assert_eq!(score, 82.5);
    }

    #[test]
    fn test_axis_totals_sum_valid() {
        let text = "\
创新点得分: 21/25
逻辑性得分: 20/25
准确性得分: 19/25
规范性得分: 22/25";
        assert_eq!(axis_totals_sum(text), Some(82.0));
    }

    #[test]
    fn test_neutral_default_when_all_fail() {
        let (score, extracted) = extract_integrated_score("完全没有数字的反馈。");
        assert!(!extracted);
        assert_eq!(score, NEUTRAL_INTEGRATED_SCORE);
    }

    #[test]
    fn test_axis_subtotal() {
        assert_eq!(extract_axis_score("**小计: 18.75/25**"), 18.75);
    }

    #[test]
    fn test_axis_item_sum_fallback() {
        let text = "维度一 5.00/6.25，维度二 4.50/6.25，维度三 5.25/6.25，维度四 4.00/6.25";
        assert_eq!(extract_axis_score(text), 18.75);
    }

    #[test]
    fn test_axis_default_zero() {
        assert_eq!(extract_axis_score("没有任何分数"), 0.0);
    }
}
