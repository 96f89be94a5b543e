//! Offline unit tests for newsdesk-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use newsdesk_core::{AppConfig, Environment, FetchLogEntry, FetchStatus};
use newsdesk_db::{DbError, FetchLogRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        sources_path: PathBuf::from("./config/sources.yaml"),
        news_api_key: None,
        scrape_api_key: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        fetch_timeout_secs: 8,
        run_budget_secs: 30,
        max_concurrent_sources: 4,
        user_agent: "ua".to_string(),
        max_retries: 2,
        retry_backoff_base_ms: 500,
        refresh_cron: "0 0 */6 * * *".to_string(),
        refresh_max_age_hours: 48,
        refresh_categories: vec!["general".to_string()],
        refresh_target_per_category: 30,
    }
}

fn log_row(status: &str) -> FetchLogRow {
    FetchLogRow {
        id: 1,
        run_id: Uuid::new_v4(),
        source_name: "wire-rss".to_string(),
        category: "technology".to_string(),
        articles_fetched: 12,
        articles_stored: 5,
        status: status.to_string(),
        error_message: None,
        execution_time_ms: 340,
        logged_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn fetch_log_row_converts_to_entry() {
    let entry = FetchLogEntry::try_from(log_row("no_data")).expect("valid status");
    assert_eq!(entry.status, FetchStatus::NoData);
    assert_eq!(entry.articles_fetched, 12);
    assert_eq!(entry.articles_stored, 5);
    assert_eq!(entry.execution_time_ms, 340);
}

#[test]
fn fetch_log_row_with_unknown_status_is_rejected() {
    let err = FetchLogEntry::try_from(log_row("partial")).unwrap_err();
    assert!(matches!(err, DbError::InvalidRow(ref m) if m.contains("partial")));
}
