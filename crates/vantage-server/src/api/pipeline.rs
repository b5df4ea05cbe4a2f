use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vantage_core::{PipelineKind, TriggerKind};
use vantage_pipeline::{GovernedRun, PipelineError, StageOptions};

use crate::middleware::{trigger_kind, RequestId};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PipelineQuery {
    pub persona_id: Option<Uuid>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RunCompleted<T: Serialize> {
    success: bool,
    run_id: Uuid,
    trigger: TriggerKind,
    #[serde(flatten)]
    report: T,
}

#[derive(Debug, Serialize)]
struct RunDenied {
    success: bool,
    error: String,
    used: i64,
    limit: i64,
}

#[derive(Debug, Serialize)]
struct RunFailed {
    success: bool,
    run_id: Uuid,
    error: String,
}

/// 200 with the report, 429 on denial, 500 when the stage failed.
pub(super) fn governed_response<T: Serialize>(run: GovernedRun<T>, trigger: TriggerKind) -> Response {
    match run {
        GovernedRun::Completed { run_id, report } => (
            StatusCode::OK,
            Json(RunCompleted {
                success: true,
                run_id,
                trigger,
                report,
            }),
        )
            .into_response(),
        GovernedRun::Denied(decision) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RunDenied {
                success: false,
                error: decision.message.unwrap_or_default(),
                used: decision.used,
                limit: decision.limit,
            }),
        )
            .into_response(),
        GovernedRun::Failed { run_id, error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RunFailed {
                success: false,
                run_id,
                error: error.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Errors raised before a run was admitted.
pub(super) fn admission_error(request_id: String, error: &PipelineError) -> ApiError {
    match error {
        PipelineError::InvalidRequest(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        other => {
            tracing::error!(error = %other, "pipeline admission failed");
            ApiError::new(request_id, "internal_error", other.to_string())
        }
    }
}

pub(super) async fn run_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
    Query(query): Query<PipelineQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind = match name.parse::<PipelineKind>() {
        Ok(kind) if kind != PipelineKind::Analysis => kind,
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("unknown pipeline: {name}"),
            ))
        }
    };
    let trigger = trigger_kind(&headers);
    let options = StageOptions {
        persona_id: query.persona_id,
        limit: query.limit,
    };

    tracing::info!(pipeline = %kind, %trigger, request_id = %req_id.0, "pipeline requested");

    let run = state
        .pipeline
        .run_governed_stage(kind, trigger, options)
        .await
        .map_err(|e| admission_error(req_id.0.clone(), &e))?;

    Ok(governed_response(run, trigger))
}
