//! Database operations for the `watchlist_companies` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `watchlist_companies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub ticker: String,
    pub name: String,
    pub slug: String,
    pub sector: String,
    pub description: String,
    pub is_main: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

const COMPANY_COLUMNS: &str =
    "id, ticker, name, slug, sector, description, is_main, metadata, created_at";

/// Returns the watchlist, main company first, then by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_watchlist_companies(pool: &PgPool) -> Result<Vec<CompanyRow>, DbError> {
    let rows = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM watchlist_companies ORDER BY is_main DESC, name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one company by its URL slug.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no company has the slug, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_company_by_slug(pool: &PgPool, slug: &str) -> Result<CompanyRow, DbError> {
    sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM watchlist_companies WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
