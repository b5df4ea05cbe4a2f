mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vantage_pipeline::Pipeline;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(vantage_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = vantage_db::connect_pool_from_config(&config).await?;
    vantage_db::run_migrations(&pool).await?;
    seed_catalog(&pool, &config).await;

    let pipeline = Pipeline::from_app_config(pool.clone(), &config)?;

    let _scheduler = if config.scheduler_enabled {
        Some(scheduler::build_scheduler(pipeline.clone()).await?)
    } else {
        tracing::info!("scheduler disabled");
        None
    };

    let auth = AuthState::from_secret(
        config.cron_secret.as_deref(),
        matches!(config.env, vantage_core::Environment::Development),
    )?;
    let app = build_app(AppState { pool, pipeline }, auth, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Upsert the source catalog, watchlist companies and default persona.
/// Failures are logged and startup continues with whatever the database
/// already holds.
async fn seed_catalog(pool: &sqlx::PgPool, config: &vantage_core::AppConfig) {
    match vantage_core::load_sources(&config.sources_path) {
        Ok(file) => {
            match vantage_db::seed_sources(pool, &file.sources).await {
                Ok(count) => tracing::info!(count, "sources seeded"),
                Err(e) => tracing::warn!(error = %e, "source seeding failed"),
            }
            match vantage_db::seed_companies(pool, &file.companies).await {
                Ok(count) => tracing::info!(count, "watchlist companies seeded"),
                Err(e) => tracing::warn!(error = %e, "company seeding failed"),
            }
        }
        Err(e) => tracing::warn!(error = %e, "source catalog not loaded"),
    }

    match vantage_core::load_persona(&config.persona_path) {
        Ok(seed) => match vantage_db::seed_persona(pool, &seed).await {
            Ok(seeded) => tracing::info!(
                persona_id = %seeded.id,
                inserted = seeded.inserted,
                is_default = seeded.is_default,
                "persona seeded"
            ),
            Err(e) => tracing::warn!(error = %e, "persona seeding failed"),
        },
        Err(e) => tracing::warn!(error = %e, "persona seed not loaded"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
