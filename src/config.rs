//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCRIBE__*` 覆盖
//! （双下划线表示嵌套，如 `SCRIBE__LLM__PROVIDER=mock`）。
//! 配置在启动时装配为不可变值传入各组件，运行期没有全局可变状态。

use std::path::PathBuf;

use serde::Deserialize;

use crate::ledger::QuotaPlan;
use crate::patch::PatchConfig;
use crate::refine::RefineConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub citation: CitationSection,
    pub refine: RefineSection,
    pub artifact: ArtifactSection,
}

/// [llm] 段：后端选择、输出长度上限与重试 / 限频
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai（兼容端点）/ mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// 专家评审调用的输出上限
    pub review_max_tokens: u32,
    /// 段落修改调用的输出上限
    pub patch_max_tokens: u32,
    /// 任务拆解调用的输出上限
    pub plan_max_tokens: u32,
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    /// 同一提供方相邻调用的最小间隔（秒）
    pub min_interval_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "deepseek-ai/DeepSeek-V3".to_string(),
            base_url: None,
            api_key: None,
            review_max_tokens: 32768,
            patch_max_tokens: 8192,
            plan_max_tokens: 8192,
            max_attempts: 3,
            backoff_base_ms: 500,
            min_interval_secs: 10,
        }
    }
}

/// [citation] 段：配额占比与检索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CitationSection {
    /// 全文引用总配额
    pub total_quota: usize,
    pub introduction_fraction: f64,
    pub chapter_count: usize,
    pub chapter_fraction: f64,
    pub conclusion_fraction: f64,
    /// 检索相似度阈值
    pub similarity_threshold: f32,
    /// 每次检索的候选数
    pub top_k: usize,
}

impl Default for CitationSection {
    fn default() -> Self {
        Self {
            total_quota: 25,
            introduction_fraction: 0.10,
            chapter_count: 3,
            chapter_fraction: 0.30,
            conclusion_fraction: 0.0,
            similarity_threshold: 0.2,
            top_k: 10,
        }
    }
}

impl CitationSection {
    /// 装配配额方案
    pub fn quota_plan(&self) -> QuotaPlan {
        QuotaPlan::with_uniform_chapters(
            self.total_quota,
            self.introduction_fraction,
            self.chapter_count,
            self.chapter_fraction,
            self.conclusion_fraction,
        )
    }
}

/// [refine] 段：轮次、目标分与补丁校验窗口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefineSection {
    pub max_rounds: usize,
    pub target_score: f64,
    pub min_patch_chars: usize,
    pub min_keyword_overlap: usize,
    pub length_ratio_min: f64,
    pub length_ratio_max: f64,
}

impl Default for RefineSection {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            target_score: 90.0,
            min_patch_chars: 100,
            min_keyword_overlap: 1,
            length_ratio_min: 0.5,
            length_ratio_max: 2.0,
        }
    }
}

impl RefineSection {
    pub fn refine_config(&self) -> RefineConfig {
        RefineConfig {
            max_rounds: self.max_rounds,
            target_score: self.target_score,
        }
    }

    pub fn patch_config(&self, max_tokens: u32) -> PatchConfig {
        PatchConfig {
            min_chars: self.min_patch_chars,
            min_keyword_overlap: self.min_keyword_overlap,
            length_ratio_min: self.length_ratio_min,
            length_ratio_max: self.length_ratio_max,
            max_tokens,
        }
    }
}

/// [artifact] 段：轮次产物输出目录（未设置则不落盘）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ArtifactSection {
    pub output_dir: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 SCRIBE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCRIBE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCRIBE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
