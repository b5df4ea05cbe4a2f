//! Database operations for the `sources` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::{CoreError, SourceDescriptor};

use crate::DbError;

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: Uuid,
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub category: String,
    pub enabled: bool,
    pub fetch_interval_minutes: i32,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SourceRow {
    /// Connector-facing view of this source.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownVariant`] if `source_type` is not a known tag.
    pub fn descriptor(&self) -> Result<SourceDescriptor, CoreError> {
        Ok(SourceDescriptor {
            id: self.id,
            name: self.name.clone(),
            source_type: self.source_type.parse()?,
            url: self.url.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

const SOURCE_COLUMNS: &str = "id, name, source_type, url, category, enabled, \
     fetch_interval_minutes, last_fetched_at, metadata, created_at";

/// Returns all enabled sources ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_enabled_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources WHERE enabled = true ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every source, enabled or not, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sets `last_fetched_at = NOW()` for a source.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no source has the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_source_fetched(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE sources SET last_fetched_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
