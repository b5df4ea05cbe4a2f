//! Pipeline, usage and briefing commands.

use serde::Serialize;
use uuid::Uuid;
use vantage_core::{AnalysisKind, PipelineKind, TriggerKind};
use vantage_pipeline::{
    daily_usage_summary, usage::today, AnalysisRequest, GovernedRun, Pipeline, StageOptions,
};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a completed report; denial and failure become errors so the exit
/// status is non-zero.
fn finish<T: Serialize>(pipeline: PipelineKind, run: GovernedRun<T>) -> anyhow::Result<()> {
    match run {
        GovernedRun::Completed { run_id, report } => {
            tracing::info!(%pipeline, %run_id, "run recorded");
            print_json(&report)
        }
        GovernedRun::Denied(decision) => anyhow::bail!(
            "{}",
            decision
                .message
                .unwrap_or_else(|| format!("{pipeline} denied"))
        ),
        GovernedRun::Failed { run_id, error } => {
            anyhow::bail!("{pipeline} run {run_id} failed: {error}")
        }
    }
}

pub(crate) async fn run_stage(
    pool: &sqlx::PgPool,
    config: &vantage_core::AppConfig,
    kind: PipelineKind,
    trigger: TriggerKind,
    persona_id: Option<Uuid>,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_app_config(pool.clone(), config)?;
    let run = pipeline
        .run_governed_stage(kind, trigger, StageOptions { persona_id, limit })
        .await?;
    finish(kind, run)
}

pub(crate) async fn analyze(
    pool: &sqlx::PgPool,
    config: &vantage_core::AppConfig,
    topic: String,
    kind: AnalysisKind,
    persona_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_app_config(pool.clone(), config)?;
    let request = AnalysisRequest {
        topic,
        kind,
        persona_id,
    };
    let run = pipeline
        .run_governed_analysis(TriggerKind::Manual, &request)
        .await?;
    finish(PipelineKind::Analysis, run)
}

pub(crate) async fn usage(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let store = vantage_pipeline::PgStore::new(pool.clone());
    let date = today();
    let summary = daily_usage_summary(&store, date).await?;

    println!("usage for {date} (UTC)");
    println!(
        "{:<10} {:>6} {:>8} {:>10}",
        "pipeline", "cron", "manual", "tokens"
    );
    for row in &summary {
        println!(
            "{:<10} {:>6} {:>8} {:>10}",
            row.pipeline.as_str(),
            format!("{}/{}", row.cron_used, row.cron_limit),
            format!("{}/{}", row.manual_used, row.manual_limit),
            row.total_tokens
        );
    }
    Ok(())
}

pub(crate) async fn latest_briefing(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let briefing = vantage_db::get_latest_briefing(pool, None)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no briefing generated yet"))?;

    println!(
        "<!-- briefing {} generated {} from {} articles -->\n",
        briefing.id,
        briefing.generated_at.to_rfc3339(),
        briefing.article_ids.len()
    );
    println!("{}", briefing.content);
    Ok(())
}
