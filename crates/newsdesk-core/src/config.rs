use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if required vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
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

    // Empty strings count as absent so `NEWS_API_KEY=` in a .env disables the adapter.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("NEWSDESK_ENV", "development"));

    let bind_addr: SocketAddr =
        parse_as("NEWSDESK_BIND_ADDR", &or_default("NEWSDESK_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("NEWSDESK_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "NEWSDESK_SOURCES_PATH",
        "./config/sources.yaml",
    ));
    let news_api_key = optional("NEWS_API_KEY");
    let scrape_api_key = optional("SCRAPE_API_KEY");

    let db_max_connections = parse_as(
        "NEWSDESK_DB_MAX_CONNECTIONS",
        &or_default("NEWSDESK_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_as(
        "NEWSDESK_DB_MIN_CONNECTIONS",
        &or_default("NEWSDESK_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_as(
        "NEWSDESK_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("NEWSDESK_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let fetch_timeout_secs = parse_as(
        "NEWSDESK_FETCH_TIMEOUT_SECS",
        &or_default("NEWSDESK_FETCH_TIMEOUT_SECS", "8"),
    )?;
    let run_budget_secs = parse_as(
        "NEWSDESK_RUN_BUDGET_SECS",
        &or_default("NEWSDESK_RUN_BUDGET_SECS", "30"),
    )?;
    let max_concurrent_sources: usize = parse_as(
        "NEWSDESK_MAX_CONCURRENT_SOURCES",
        &or_default("NEWSDESK_MAX_CONCURRENT_SOURCES", "4"),
    )?;
    if max_concurrent_sources == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEWSDESK_MAX_CONCURRENT_SOURCES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let user_agent = or_default("NEWSDESK_USER_AGENT", "newsdesk/0.1 (news-ingestion)");
    let max_retries = parse_as(
        "NEWSDESK_MAX_RETRIES",
        &or_default("NEWSDESK_MAX_RETRIES", "2"),
    )?;
    let retry_backoff_base_ms = parse_as(
        "NEWSDESK_RETRY_BACKOFF_BASE_MS",
        &or_default("NEWSDESK_RETRY_BACKOFF_BASE_MS", "500"),
    )?;

    let refresh_cron = or_default("NEWSDESK_REFRESH_CRON", "0 0 */6 * * *");
    let refresh_max_age_hours = parse_as(
        "NEWSDESK_REFRESH_MAX_AGE_HOURS",
        &or_default("NEWSDESK_REFRESH_MAX_AGE_HOURS", "48"),
    )?;
    let refresh_categories = parse_categories(&or_default(
        "NEWSDESK_REFRESH_CATEGORIES",
        "general,technology,business",
    ));
    let refresh_target_per_category = parse_as(
        "NEWSDESK_REFRESH_TARGET_PER_CATEGORY",
        &or_default("NEWSDESK_REFRESH_TARGET_PER_CATEGORY", "30"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        sources_path,
        news_api_key,
        scrape_api_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        run_budget_secs,
        max_concurrent_sources,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        refresh_cron,
        refresh_max_age_hours,
        refresh_categories,
        refresh_target_per_category,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Split a comma-separated category list, lowercasing and dropping blanks.
fn parse_categories(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for category in raw.split(',').map(|c| c.trim().to_lowercase()) {
        if !category.is_empty() && !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
