//! 轮次产物持久化
//!
//! 每轮评审-修改的快照落盘为一个 JSON 文件，供审计与断点续跑；
//! 精修流程的正确性不依赖这里的任何文件。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DraftError;
use crate::refine::RoundResult;

/// 轮次产物存储：目录下按轮次编号写 review_round_{n}.json
pub struct RoundArtifactStore {
    dir: PathBuf,
}

impl RoundArtifactStore {
    /// 创建存储目录（已存在则复用）
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DraftError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn round_path(&self, round: usize) -> PathBuf {
        self.dir.join(format!("review_round_{}.json", round))
    }

    /// 落盘一轮结果，返回写入路径
    pub fn save(&self, result: &RoundResult) -> Result<PathBuf, DraftError> {
        let path = self.round_path(result.round);
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json)?;
        tracing::info!(round = result.round, path = %path.display(), "round artifact saved");
        Ok(path)
    }

    /// 读回指定轮次（审计 / 续跑用）
    pub fn load(&self, round: usize) -> Result<RoundResult, DraftError> {
        let raw = fs::read_to_string(self.round_path(round))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::AxisScores;

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RoundArtifactStore::new(tmp.path().join("rounds")).unwrap();

        let result = RoundResult {
            round: 2,
            axis_scores: AxisScores {
                innovation: 18.0,
                logic: 17.5,
                accuracy: 16.0,
                norm: 19.0,
            },
            integrated_score: 70.5,
            score_extracted: true,
            tasks: Vec::new(),
            document: "## 一、引言\n\n正文。".to_string(),
            became_best: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let path = store.save(&result).unwrap();
        assert!(path.ends_with("review_round_2.json"));

        let loaded = store.load(2).unwrap();
        assert_eq!(loaded.round, 2);
        assert_eq!(loaded.integrated_score, 70.5);
        assert!(loaded.became_best);
        assert_eq!(loaded.document, result.document);
    }
}
