use crate::app_config::{AppConfig, Environment, ModelConfig};
use crate::ConfigError;

pub const DEFAULT_FAST_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_DEEP_MODEL: &str = "claude-opus-4-1-20250805";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("VANTAGE_ENV", "development"))?;

    let bind_addr = or_default("VANTAGE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("VANTAGE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("VANTAGE_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("VANTAGE_SOURCES_PATH", "./config/sources.yaml"));
    let persona_path = PathBuf::from(or_default("VANTAGE_PERSONA_PATH", "./config/persona.yaml"));

    let db_max_connections = parse_u32("VANTAGE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VANTAGE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("VANTAGE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "VANTAGE_DB_MIN_CONNECTIONS",
            format!("must not exceed VANTAGE_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let anthropic_api_key = lookup("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let anthropic_base_url = or_default("VANTAGE_ANTHROPIC_BASE_URL", "https://api.anthropic.com");
    let llm_max_attempts = parse_u32("VANTAGE_LLM_MAX_ATTEMPTS", "3")?;
    if llm_max_attempts == 0 {
        return Err(invalid("VANTAGE_LLM_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    let llm_backoff_base_ms = parse_u64("VANTAGE_LLM_BACKOFF_BASE_MS", "1000")?;
    let llm_timeout_secs = parse_u64("VANTAGE_LLM_TIMEOUT_SECS", "120")?;

    let models = ModelConfig {
        enrich: or_default("VANTAGE_ENRICH_MODEL", DEFAULT_FAST_MODEL),
        connect: or_default("VANTAGE_CONNECT_MODEL", DEFAULT_FAST_MODEL),
        briefing: or_default("VANTAGE_BRIEFING_MODEL", DEFAULT_DEEP_MODEL),
        analysis: or_default("VANTAGE_ANALYSIS_MODEL", DEFAULT_DEEP_MODEL),
    };

    let http_timeout_secs = parse_u64("VANTAGE_HTTP_TIMEOUT_SECS", "15")?;
    let http_user_agent = or_default("VANTAGE_HTTP_USER_AGENT", "Vantage Intelligence Dashboard/1.0");
    let sec_user_agent = or_default("VANTAGE_SEC_USER_AGENT", "Vantage Intelligence ops@vantage.local");

    let fetch_max_concurrent_sources = parse_usize("VANTAGE_FETCH_MAX_CONCURRENT_SOURCES", "4")?;
    let enrich_batch_limit = parse_u32("VANTAGE_ENRICH_BATCH_LIMIT", "20")?;
    let enrich_delay_ms = parse_u64("VANTAGE_ENRICH_DELAY_MS", "500")?;

    let default_persona_id = match lookup("VANTAGE_DEFAULT_PERSONA_ID") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<uuid::Uuid>()
                .map_err(|e| invalid("VANTAGE_DEFAULT_PERSONA_ID", e.to_string()))?,
        ),
        _ => None,
    };

    let cron_secret = lookup("CRON_SECRET").ok().filter(|s| !s.trim().is_empty());
    let scheduler_enabled = parse_bool("VANTAGE_SCHEDULER_ENABLED", "true")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        sources_path,
        persona_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        anthropic_api_key,
        anthropic_base_url,
        llm_max_attempts,
        llm_backoff_base_ms,
        llm_timeout_secs,
        models,
        http_timeout_secs,
        http_user_agent,
        sec_user_agent,
        fetch_max_concurrent_sources,
        enrich_batch_limit,
        enrich_delay_ms,
        default_persona_id,
        cron_secret,
        scheduler_enabled,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VANTAGE_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
