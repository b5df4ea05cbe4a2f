//! Database operations for `pipeline_runs`, the usage ledger.
//!
//! Only `success` rows count toward a daily quota. A governed run first
//! reserves a `running` row under an advisory lock, then finishes it as
//! `success` or `failed`. Reservations older than the stale window stop
//! counting so a crashed process cannot pin the quota.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::{PipelineKind, RunStatus, TriggerKind};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: Uuid,
    pub pipeline: String,
    pub trigger_kind: String,
    pub status: String,
    pub token_count: i64,
    pub items_processed: i32,
    pub error_message: Option<String>,
    pub run_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A finished run to append to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPipelineRun {
    pub pipeline: PipelineKind,
    pub trigger: TriggerKind,
    pub status: RunStatus,
    pub token_count: i64,
    pub items_processed: i32,
    pub error_message: Option<String>,
    pub run_date: NaiveDate,
}

/// Outcome of an atomic admission attempt.
#[derive(Debug, Clone)]
pub enum Reservation {
    /// A `running` row was inserted and now counts against the quota.
    Reserved(PipelineRunRow),
    /// The quota is exhausted; `used` includes fresh reservations.
    Denied { used: i64 },
}

/// Successful-run count and token total per pipeline and trigger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageCountRow {
    pub pipeline: String,
    pub trigger_kind: String,
    pub successes: i64,
    pub tokens: i64,
}

const RUN_COLUMNS: &str = "id, pipeline, trigger_kind, status, token_count, items_processed, \
     error_message, run_date, created_at, completed_at";

// ---------------------------------------------------------------------------
// Quota reads
// ---------------------------------------------------------------------------

/// Counts `success` rows for a pipeline, trigger and date.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_successful_runs(
    pool: &PgPool,
    pipeline: PipelineKind,
    trigger: TriggerKind,
    run_date: NaiveDate,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pipeline_runs \
         WHERE pipeline = $1 AND trigger_kind = $2 AND run_date = $3 AND status = 'success'",
    )
    .bind(pipeline.as_str())
    .bind(trigger.as_str())
    .bind(run_date)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Per pipeline and trigger: successful runs and their token total on `run_date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn usage_for_date(pool: &PgPool, run_date: NaiveDate) -> Result<Vec<UsageCountRow>, DbError> {
    let rows = sqlx::query_as::<_, UsageCountRow>(
        "SELECT pipeline, trigger_kind, COUNT(*) AS successes, \
                COALESCE(SUM(token_count), 0)::BIGINT AS tokens \
         FROM pipeline_runs \
         WHERE run_date = $1 AND status = 'success' \
         GROUP BY pipeline, trigger_kind \
         ORDER BY pipeline, trigger_kind",
    )
    .bind(run_date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every ledger row for `run_date`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pipeline_runs_for_date(
    pool: &PgPool,
    run_date: NaiveDate,
) -> Result<Vec<PipelineRunRow>, DbError> {
    let rows = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM pipeline_runs \
         WHERE run_date = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(run_date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Ledger writes
// ---------------------------------------------------------------------------

/// Appends a finished run to the ledger.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_pipeline_run(
    pool: &PgPool,
    run: &NewPipelineRun,
) -> Result<PipelineRunRow, DbError> {
    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "INSERT INTO pipeline_runs (id, pipeline, trigger_kind, status, token_count, \
                                    items_processed, error_message, run_date, completed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                 CASE WHEN $4 = 'running' THEN NULL ELSE NOW() END) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run.pipeline.as_str())
    .bind(run.trigger.as_str())
    .bind(run.status.as_str())
    .bind(run.token_count)
    .bind(run.items_processed)
    .bind(&run.error_message)
    .bind(run.run_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Atomically checks the quota and reserves a `running` row.
///
/// Runs in one transaction holding a transaction-scoped advisory lock keyed
/// on (pipeline, trigger, date), so concurrent callers serialize here.
/// Counts `success` rows plus `running` rows younger than `stale_after_secs`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written.
pub async fn reserve_pipeline_run(
    pool: &PgPool,
    pipeline: PipelineKind,
    trigger: TriggerKind,
    run_date: NaiveDate,
    limit: i64,
    stale_after_secs: i64,
) -> Result<Reservation, DbError> {
    let mut tx = pool.begin().await?;
    let lock_key = format!("pipeline_runs:{pipeline}:{trigger}:{run_date}");

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&lock_key)
        .execute(&mut *tx)
        .await?;

    let used = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pipeline_runs \
         WHERE pipeline = $1 AND trigger_kind = $2 AND run_date = $3 \
           AND (status = 'success' \
                OR (status = 'running' AND created_at > NOW() - make_interval(secs => $4::double precision)))",
    )
    .bind(pipeline.as_str())
    .bind(trigger.as_str())
    .bind(run_date)
    .bind(stale_after_secs)
    .fetch_one(&mut *tx)
    .await?;

    if used >= limit {
        tx.rollback().await?;
        return Ok(Reservation::Denied { used });
    }

    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "INSERT INTO pipeline_runs (id, pipeline, trigger_kind, status, run_date) \
         VALUES ($1, $2, $3, 'running', $4) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(pipeline.as_str())
    .bind(trigger.as_str())
    .bind(run_date)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Reservation::Reserved(row))
}

/// Marks a reserved run `success` with its counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_pipeline_run(
    pool: &PgPool,
    id: Uuid,
    items_processed: i32,
    token_count: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'success', completed_at = NOW(), items_processed = $1, token_count = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(items_processed)
    .bind(token_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a reserved run `failed` with the captured error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_pipeline_run(pool: &PgPool, id: Uuid, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}
