//! `vantage db` handlers.

pub(crate) async fn ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    vantage_db::ping(pool).await?;
    println!("database: ok");
    Ok(())
}

pub(crate) async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = vantage_db::run_migrations(pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

/// Seed sources, watchlist companies and the default persona from the
/// configured YAML files.
///
/// # Errors
///
/// Returns an error if either file fails to load or validate, or a write
/// fails.
pub(crate) async fn seed(
    pool: &sqlx::PgPool,
    config: &vantage_core::AppConfig,
) -> anyhow::Result<()> {
    let catalog = vantage_core::load_sources(&config.sources_path)?;
    let count = vantage_db::seed_sources(pool, &catalog.sources).await?;
    println!("sources upserted: {count}");
    let companies = vantage_db::seed_companies(pool, &catalog.companies).await?;
    println!("watchlist companies upserted: {companies}");

    let persona = vantage_core::load_persona(&config.persona_path)?;
    let seeded = vantage_db::seed_persona(pool, &persona).await?;
    println!(
        "persona '{}' {} ({}default)",
        persona.name,
        if seeded.inserted { "inserted" } else { "already present" },
        if seeded.is_default { "" } else { "not " },
    );
    Ok(())
}
