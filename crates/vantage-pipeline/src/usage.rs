//! Usage governor: daily admission caps per pipeline and trigger kind.
//!
//! Governed runs reserve a `running` ledger row atomically before the stage
//! starts and finish it as `success` or `failed`. Only `success` rows, plus
//! reservations younger than [`RESERVATION_STALE_SECS`], count against the cap.

use std::future::Future;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;
use vantage_core::{PipelineKind, RunStatus, TriggerKind};
use vantage_db::{DbError, NewPipelineRun, PipelineRunRow, Reservation};

use crate::error::PipelineError;
use crate::store::PipelineStore;

/// A reservation older than this is treated as abandoned.
pub const RESERVATION_STALE_SECS: i64 = 30 * 60;

/// Ledger calendar day (UTC).
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub used: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdmissionDecision {
    #[must_use]
    pub fn evaluate(pipeline: PipelineKind, trigger: TriggerKind, used: i64, limit: i64) -> Self {
        if used >= limit {
            Self {
                allowed: false,
                used,
                limit,
                message: Some(format!(
                    "Daily {trigger} limit reached for {pipeline}: {used}/{limit}"
                )),
            }
        } else {
            Self {
                allowed: true,
                used,
                limit,
                message: None,
            }
        }
    }
}

/// Read-only admission check against today's `success` rows.
///
/// # Errors
///
/// Returns [`DbError`] if the count query fails.
pub async fn check_daily_limit(
    store: &dyn PipelineStore,
    pipeline: PipelineKind,
    trigger: TriggerKind,
    run_date: NaiveDate,
) -> Result<AdmissionDecision, DbError> {
    let used = store
        .count_successful_runs(pipeline, trigger, run_date)
        .await?;
    Ok(AdmissionDecision::evaluate(
        pipeline,
        trigger,
        used,
        pipeline.limit_for(trigger),
    ))
}

/// Append a finished run to the ledger.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn record_pipeline_run(
    store: &dyn PipelineStore,
    run: &NewPipelineRun,
) -> Result<PipelineRunRow, DbError> {
    store.insert_pipeline_run(run).await
}

/// Today's consumption for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineUsage {
    pub pipeline: PipelineKind,
    pub cron_used: i64,
    pub cron_limit: i64,
    pub manual_used: i64,
    pub manual_limit: i64,
    pub total_tokens: i64,
}

/// One entry per pipeline kind, zeros included.
///
/// # Errors
///
/// Returns [`DbError`] if the usage query fails.
pub async fn daily_usage_summary(
    store: &dyn PipelineStore,
    run_date: NaiveDate,
) -> Result<Vec<PipelineUsage>, DbError> {
    let rows = store.usage_for_date(run_date).await?;

    Ok(PipelineKind::ALL
        .iter()
        .map(|&pipeline| {
            let limits = pipeline.daily_limit();
            let mut usage = PipelineUsage {
                pipeline,
                cron_used: 0,
                cron_limit: limits.cron,
                manual_used: 0,
                manual_limit: limits.manual,
                total_tokens: 0,
            };
            for row in rows.iter().filter(|r| r.pipeline == pipeline.as_str()) {
                match row.trigger_kind.parse::<TriggerKind>() {
                    Ok(TriggerKind::Cron) => usage.cron_used += row.successes,
                    Ok(TriggerKind::Manual) => usage.manual_used += row.successes,
                    Err(e) => {
                        tracing::warn!(error = %e, "ledger row with unknown trigger kind");
                        continue;
                    }
                }
                usage.total_tokens += row.tokens;
            }
            usage
        })
        .collect())
}

/// Counts a governed run reports back to the ledger.
pub trait RunMetrics {
    fn items_processed(&self) -> i32;
    fn total_tokens(&self) -> i64;
}

/// Outcome of a governed run.
#[derive(Debug)]
pub enum GovernedRun<T> {
    /// Quota exhausted; nothing ran and nothing was written.
    Denied(AdmissionDecision),
    Completed { run_id: Uuid, report: T },
    /// The stage ran and failed; the ledger row is `failed`.
    Failed { run_id: Uuid, error: PipelineError },
}

impl<T> GovernedRun<T> {
    #[must_use]
    pub fn status(&self) -> Option<RunStatus> {
        match self {
            GovernedRun::Denied(_) => None,
            GovernedRun::Completed { .. } => Some(RunStatus::Success),
            GovernedRun::Failed { .. } => Some(RunStatus::Failed),
        }
    }
}

/// Admit, run and record one stage.
///
/// Ledger writes after the stage has run are logged on failure rather than
/// returned, so a finished stage's report is never lost.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only if the reservation itself fails.
pub async fn run_governed<T, F, Fut>(
    store: &dyn PipelineStore,
    pipeline: PipelineKind,
    trigger: TriggerKind,
    stage: F,
) -> Result<GovernedRun<T>, PipelineError>
where
    T: RunMetrics,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let limit = pipeline.limit_for(trigger);
    let reservation = store
        .reserve_pipeline_run(pipeline, trigger, today(), limit, RESERVATION_STALE_SECS)
        .await?;

    let run = match reservation {
        Reservation::Denied { used } => {
            let decision = AdmissionDecision::evaluate(pipeline, trigger, used, limit);
            tracing::info!(%pipeline, %trigger, used, limit, "pipeline run denied");
            return Ok(GovernedRun::Denied(decision));
        }
        Reservation::Reserved(run) => run,
    };

    tracing::info!(%pipeline, %trigger, run_id = %run.id, "pipeline run admitted");

    match stage().await {
        Ok(report) => {
            let items = report.items_processed();
            let tokens = report.total_tokens();
            if let Err(e) = store.complete_pipeline_run(run.id, items, tokens).await {
                tracing::error!(%pipeline, run_id = %run.id, error = %e, "failed to record successful run");
            }
            tracing::info!(%pipeline, %trigger, items, tokens, "pipeline run succeeded");
            Ok(GovernedRun::Completed {
                run_id: run.id,
                report,
            })
        }
        Err(error) => {
            tracing::error!(%pipeline, %trigger, error = %error, "pipeline run failed");
            if let Err(e) = store.fail_pipeline_run(run.id, &error.to_string()).await {
                tracing::error!(%pipeline, run_id = %run.id, error = %e, "failed to record failed run");
            }
            Ok(GovernedRun::Failed {
                run_id: run.id,
                error,
            })
        }
    }
}
