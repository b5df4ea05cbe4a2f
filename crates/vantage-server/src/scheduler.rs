//! In-process cron jobs for the four scheduled stages.
//!
//! Every job runs its stage as a governed `cron` run, so a second firing on
//! the same day is denied by the usage governor rather than by the scheduler.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use vantage_core::{PipelineKind, TriggerKind};
use vantage_pipeline::{GovernedRun, Pipeline, StageOptions};

/// Stage, default schedule (sec min hour dom mon dow, UTC) and override var.
const SCHEDULES: &[(PipelineKind, &str, &str)] = &[
    (PipelineKind::Fetch, "0 0 5 * * *", "VANTAGE_FETCH_CRON"),
    (PipelineKind::Enrich, "0 30 5 * * *", "VANTAGE_ENRICH_CRON"),
    (PipelineKind::Connect, "0 0 6 * * *", "VANTAGE_CONNECT_CRON"),
    (PipelineKind::Briefing, "0 30 6 * * *", "VANTAGE_BRIEFING_CRON"),
];

/// Builds and starts the scheduler.
///
/// The returned handle must stay alive for the lifetime of the process;
/// dropping it stops every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot start or a cron
/// expression is rejected.
pub async fn build_scheduler(pipeline: Pipeline) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for &(kind, default_schedule, var) in SCHEDULES {
        let schedule = std::env::var(var)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_schedule.to_string());
        register_stage_job(&scheduler, pipeline.clone(), kind, &schedule).await?;
        tracing::info!(pipeline = %kind, schedule = %schedule, "scheduled stage registered");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_stage_job(
    scheduler: &JobScheduler,
    pipeline: Pipeline,
    kind: PipelineKind,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pipeline = pipeline.clone();

        Box::pin(async move {
            tracing::info!(pipeline = %kind, "scheduler: starting run");
            run_scheduled(&pipeline, kind).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_scheduled(pipeline: &Pipeline, kind: PipelineKind) {
    match pipeline
        .run_governed_stage(kind, TriggerKind::Cron, StageOptions::default())
        .await
    {
        Ok(GovernedRun::Completed { run_id, .. }) => {
            tracing::info!(pipeline = %kind, %run_id, "scheduler: run complete");
        }
        Ok(GovernedRun::Denied(decision)) => {
            tracing::info!(
                pipeline = %kind,
                used = decision.used,
                limit = decision.limit,
                "scheduler: run skipped, daily limit reached"
            );
        }
        Ok(GovernedRun::Failed { run_id, error }) => {
            tracing::error!(pipeline = %kind, %run_id, error = %error, "scheduler: run failed");
        }
        Err(e) => {
            tracing::error!(pipeline = %kind, error = %e, "scheduler: could not admit run");
        }
    }
}
