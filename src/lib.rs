//! Scribe - Rust 学术长文迭代精修系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **ledger**: 引用台账（编号分配、配额闸门、多样性选择、正文同步）
//! - **structure**: 文档结构解析（两级标题、摘要与参考文献特殊区、扁平节点表）
//! - **review**: 多专家评审聚合与评分提取（识别器链）
//! - **plan**: 整合意见 → 原子修改任务
//! - **patch**: 结构化补丁执行器（定位、校验、一段一改）
//! - **refine**: 精修控制器（评审 → 拆解 → 补丁 → 评分 → 接受或回滚）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock），重试与限频
//! - **literature / retrieval**: 文献池解析与检索接口
//! - **artifact**: 轮次产物落盘（审计 / 续跑）

pub mod artifact;
pub mod config;
pub mod error;
pub mod ledger;
pub mod literature;
pub mod llm;
pub mod observability;
pub mod patch;
pub mod plan;
pub mod refine;
pub mod retrieval;
pub mod review;
pub mod structure;
pub mod tokenize;

pub use error::DraftError;
pub use refine::{RefineConfig, RefineOutcome, RefinementController, RoundResult};
