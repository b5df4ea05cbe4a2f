use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use vantage_core::{CompanyConfig, PersonaSeed, SourceConfig};

use crate::DbError;

/// Result of seeding the default persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededPersona {
    pub id: Uuid,
    pub inserted: bool,
    pub is_default: bool,
}

/// Upsert sources from the catalog, keyed by name.
///
/// Returns the number of sources processed. All upserts run inside a single
/// transaction. `last_fetched_at` is left untouched on update.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_sources(pool: &PgPool, sources: &[SourceConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for source in sources {
        sqlx::query(
            "INSERT INTO sources (id, name, source_type, url, category, enabled, \
                                  fetch_interval_minutes, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (name) DO UPDATE SET \
                 source_type = EXCLUDED.source_type, \
                 url = EXCLUDED.url, \
                 category = EXCLUDED.category, \
                 enabled = EXCLUDED.enabled, \
                 fetch_interval_minutes = EXCLUDED.fetch_interval_minutes, \
                 metadata = EXCLUDED.metadata",
        )
        .bind(Uuid::new_v4())
        .bind(&source.name)
        .bind(source.source_type.as_str())
        .bind(&source.url)
        .bind(source.category.as_str())
        .bind(source.enabled)
        .bind(source.fetch_interval_minutes)
        .bind(&source.metadata)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// Upsert watchlist companies, keyed by ticker.
///
/// When the catalog names a main company, any other row flagged `is_main` is
/// cleared first so the single-main index holds throughout the transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_companies(pool: &PgPool, companies: &[CompanyConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    if let Some(main) = companies.iter().find(|c| c.is_main) {
        sqlx::query("UPDATE watchlist_companies SET is_main = false WHERE is_main AND ticker <> $1")
            .bind(&main.ticker)
            .execute(&mut *tx)
            .await?;
    }

    let mut count = 0usize;
    for company in companies {
        sqlx::query(
            "INSERT INTO watchlist_companies (id, ticker, name, slug, sector, description, \
                                              is_main, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (ticker) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 slug = EXCLUDED.slug, \
                 sector = EXCLUDED.sector, \
                 description = EXCLUDED.description, \
                 is_main = EXCLUDED.is_main, \
                 metadata = EXCLUDED.metadata",
        )
        .bind(Uuid::new_v4())
        .bind(&company.ticker)
        .bind(&company.name)
        .bind(&company.slug)
        .bind(&company.sector)
        .bind(&company.description)
        .bind(company.is_main)
        .bind(&company.metadata)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// Insert the persona if no persona with its name exists, and flag it as
/// default when no default persona exists yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_persona(pool: &PgPool, seed: &PersonaSeed) -> Result<SeededPersona, DbError> {
    let mut tx = pool.begin().await?;

    let inserted_id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO personas (id, name, description, config) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (name) DO NOTHING \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(&seed.name)
    .bind(&seed.description)
    .bind(Json(&seed.config))
    .fetch_optional(&mut *tx)
    .await?;

    let id = match inserted_id {
        Some(id) => id,
        None => {
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM personas WHERE name = $1")
                .bind(&seed.name)
                .fetch_one(&mut *tx)
                .await?
        }
    };

    sqlx::query(
        "UPDATE personas SET is_default = true, updated_at = NOW() \
         WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM personas WHERE is_default)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let is_default: bool = sqlx::query_scalar("SELECT is_default FROM personas WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(SeededPersona {
        id,
        inserted: inserted_id.is_some(),
        is_default,
    })
}
