//! 文献检索：外部语义引擎的本地替身
//!
//! KeywordRetriever 用 jieba 分词 + Jaccard 相似度在文献池内检索；
//! 接口与语义引擎一致（按相似度降序返回 top_k），方便替换为真实后端。

use crate::literature::LiteraturePool;
use crate::tokenize;

/// 一条检索命中：池内索引 + 相似度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalHit {
    pub index: usize,
    pub similarity: f32,
}

/// 文献检索接口
pub trait LiteratureRetriever: Send + Sync {
    /// 在池内检索，按相似度降序返回至多 top_k 条；exclude_used 时跳过已引用条目
    fn search(
        &self,
        pool: &LiteraturePool,
        query: &str,
        top_k: usize,
        exclude_used: bool,
    ) -> Vec<RetrievalHit>;
}

/// 关键词检索器：题名 + 摘要分词后与查询做 Jaccard
pub struct KeywordRetriever {
    /// 低于该相似度的候选被过滤；严格过滤后无结果时做一次模糊兜底
    pub threshold: f32,
}

impl KeywordRetriever {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for KeywordRetriever {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl LiteratureRetriever for KeywordRetriever {
    fn search(
        &self,
        pool: &LiteraturePool,
        query: &str,
        top_k: usize,
        exclude_used: bool,
    ) -> Vec<RetrievalHit> {
        if pool.is_empty() || top_k == 0 {
            tracing::warn!("retrieval skipped: empty pool or zero top_k");
            return Vec::new();
        }

        let query_tokens = tokenize::tokenize_to_set(query);
        let mut scored: Vec<RetrievalHit> = pool
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| !(exclude_used && r.used))
            .map(|(index, r)| {
                let doc_tokens = tokenize::tokenize_to_set(&r.search_text());
                RetrievalHit {
                    index,
                    similarity: tokenize::jaccard_similarity(&query_tokens, &doc_tokens),
                }
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let strict: Vec<RetrievalHit> = scored
            .iter()
            .copied()
            .filter(|h| h.similarity >= self.threshold)
            .take(top_k)
            .collect();

        if !strict.is_empty() {
            return strict;
        }

        // 严格过滤后无结果：取相似度最高的一条作为模糊兜底
        match scored.first().copied() {
            Some(best) => {
                tracing::info!(query = %query, "strict retrieval empty, fuzzy fallback");
                vec![best]
            }
            None => {
                tracing::warn!(query = %query, "retrieval found no candidates");
                Vec::new()
            }
        }
    }
}

/// 空检索器：永远返回空（无文献池场景）
pub struct NoopRetriever;

impl LiteratureRetriever for NoopRetriever {
    fn search(&self, _: &LiteraturePool, _: &str, _: usize, _: bool) -> Vec<RetrievalHit> {
        Vec::new()
    }
}
