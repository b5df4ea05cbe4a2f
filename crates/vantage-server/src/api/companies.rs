use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vantage_db::CompanyRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CompanyItem {
    id: Uuid,
    ticker: String,
    name: String,
    slug: String,
    sector: String,
    description: String,
    is_main: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<CompanyRow> for CompanyItem {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            ticker: row.ticker,
            name: row.name,
            slug: row.slug,
            sector: row.sector,
            description: row.description,
            is_main: row.is_main,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_companies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CompanyItem>>>, ApiError> {
    let rows = vantage_db::list_watchlist_companies(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(CompanyItem::from).collect(),
        req_id.0,
    ))
}

pub(super) async fn get_company(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CompanyItem>>, ApiError> {
    let row = vantage_db::get_company_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(CompanyItem::from(row), req_id.0))
}
