use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::PersonaConfig;

use crate::DbError;

/// A row from the `personas` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonaRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub config: Json<PersonaConfig>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fetches a persona by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the stored config does not
/// decode.
pub async fn get_persona(pool: &PgPool, id: Uuid) -> Result<Option<PersonaRow>, DbError> {
    let row = sqlx::query_as::<_, PersonaRow>(
        "SELECT id, name, description, config, is_default, created_at, updated_at \
         FROM personas WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches the persona flagged `is_default`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the stored config does not
/// decode.
pub async fn get_default_persona(pool: &PgPool) -> Result<Option<PersonaRow>, DbError> {
    let row = sqlx::query_as::<_, PersonaRow>(
        "SELECT id, name, description, config, is_default, created_at, updated_at \
         FROM personas WHERE is_default = true \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
