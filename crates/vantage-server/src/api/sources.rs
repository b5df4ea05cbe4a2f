use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
    id: Uuid,
    name: String,
    source_type: String,
    url: String,
    category: String,
    enabled: bool,
    fetch_interval_minutes: i32,
    last_fetched_at: Option<DateTime<Utc>>,
}

/// The whole catalog, disabled sources included.
pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SourceItem>>>, ApiError> {
    let rows = vantage_db::list_sources(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SourceItem {
            id: row.id,
            name: row.name,
            source_type: row.source_type,
            url: row.url,
            category: row.category,
            enabled: row.enabled,
            fetch_interval_minutes: row.fetch_interval_minutes,
            last_fetched_at: row.last_fetched_at,
        })
        .collect();

    Ok(ApiResponse::new(data, req_id.0))
}
