//! Scribe 无头精修入口
//!
//! 用法：`scribe <草稿.md> [文献池.txt]`
//! 读入草稿（与可选文献池），跑完整的评审-修改循环后输出最优文本到
//! `<草稿>.refined.md`，并在终端打印各轮评分摘要。

use std::path::PathBuf;
use std::sync::Arc;

use scribe::artifact::RoundArtifactStore;
use scribe::config::load_config;
use scribe::ledger::CitationLedger;
use scribe::literature::{parse_pool, LiteraturePool};
use scribe::llm::create_llm_from_config;
use scribe::patch::PatchExecutor;
use scribe::plan::TaskPlanner;
use scribe::refine::RefinementController;
use scribe::review::CritiqueAggregator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scribe::observability::init();

    let mut args = std::env::args().skip(1);
    let Some(draft_path) = args.next().map(PathBuf::from) else {
        eprintln!("用法: scribe <草稿.md> [文献池.txt]");
        std::process::exit(2);
    };
    let pool_path = args.next().map(PathBuf::from);

    let cfg = load_config(None).unwrap_or_default();
    let llm = create_llm_from_config(&cfg.llm);

    let draft = std::fs::read_to_string(&draft_path)?;
    let pool = match &pool_path {
        Some(path) => parse_pool(&std::fs::read_to_string(path)?),
        None => LiteraturePool::default(),
    };

    let mut ledger = CitationLedger::new(pool, cfg.citation.quota_plan());

    let controller = RefinementController::new(
        CritiqueAggregator::new(llm.clone(), cfg.llm.review_max_tokens),
        TaskPlanner::new(llm.clone(), cfg.llm.plan_max_tokens),
        PatchExecutor::new(
            Arc::clone(&llm),
            cfg.refine.patch_config(cfg.llm.patch_max_tokens),
        ),
        cfg.refine.refine_config(),
    );
    let controller = match &cfg.artifact.output_dir {
        Some(dir) => controller.with_artifacts(RoundArtifactStore::new(dir)?),
        None => controller,
    };

    let outcome = controller.run(&draft, &mut ledger).await?;

    println!("\n精修完成：{} 轮，最优评分 {:.2}/100", outcome.rounds.len(), outcome.best_score);
    for round in &outcome.rounds {
        println!(
            "  第 {} 轮: {:.2} 分 {}（任务 {} 条）",
            round.round,
            round.integrated_score,
            if round.became_best { "✓ 接受" } else { "✗ 回滚" },
            round.tasks.len(),
        );
    }

    let sync = ledger.sync_with_text(&outcome.document);
    if !sync.missing_in_ledger.is_empty() {
        println!("警告：正文存在台账外引用标记 {:?}", sync.missing_in_ledger);
    }

    let out_path = draft_path.with_extension("refined.md");
    std::fs::write(&out_path, &outcome.document)?;
    println!("最优文本已写入 {}", out_path.display());

    let (prompt, completion, total) = llm.token_usage();
    if total > 0 {
        println!("Token 用量: prompt {} / completion {} / total {}", prompt, completion, total);
    }

    Ok(())
}
