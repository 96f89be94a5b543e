//! The inbound operations exposed by `IngestService`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use newsdesk_core::FetchStatus;
use newsdesk_ingest::{IngestError, MemoryStore};

use common::{batch, service, settings, source, StubAdapter};

#[tokio::test]
async fn ingest_reports_counts_and_logs() {
    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(StubAdapter::returning(batch("wire", 4)));
    let svc = service(vec![source("wire", 0, &adapter)], &store, settings());

    let response = svc.ingest("General", 20, false).await.unwrap();

    assert!(response.success);
    assert_eq!(response.total_fetched, 4);
    assert_eq!(response.total_stored, 4);
    assert_eq!(response.logs.len(), 1);
    assert_eq!(store.articles()[0].article.category, "general");
}

#[tokio::test]
async fn ingest_twice_keeps_row_count() {
    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(StubAdapter::returning(batch("wire", 4)));
    let svc = service(vec![source("wire", 0, &adapter)], &store, settings());

    svc.ingest("general", 20, false).await.unwrap();
    let second = svc.ingest("general", 20, false).await.unwrap();

    assert_eq!(second.total_stored, 0);
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn force_refresh_reports_refreshed_rows() {
    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(StubAdapter::returning(batch("wire", 2)));
    let svc = service(vec![source("wire", 0, &adapter)], &store, settings());

    svc.ingest("general", 20, false).await.unwrap();
    let refreshed = svc.ingest("general", 20, true).await.unwrap();

    assert_eq!(refreshed.total_stored, 0);
    assert_eq!(refreshed.total_refreshed, 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn empty_category_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let svc = service(vec![], &store, settings());

    let err = svc.ingest("   ", 20, false).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidRequest(_)));
}

#[tokio::test]
async fn limit_is_clamped_before_reaching_adapters() {
    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(StubAdapter::returning(Vec::new()));
    let svc = service(vec![source("wire", 0, &adapter)], &store, settings());

    svc.ingest("general", 0, false).await.unwrap();
    assert_eq!(adapter.last_limit(), 1);

    svc.ingest("general", 10_000, false).await.unwrap();
    assert_eq!(adapter.last_limit(), 100);
}

#[tokio::test]
async fn ingest_fails_only_when_every_source_errors() {
    let store = Arc::new(MemoryStore::new());
    let broken = Arc::new(StubAdapter::failing());
    let svc = service(vec![source("broken", 0, &broken)], &store, settings());
    let response = svc.ingest("general", 20, false).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.logs[0].status, FetchStatus::Error);

    let empty = Arc::new(StubAdapter::returning(Vec::new()));
    let svc = service(
        vec![source("broken", 0, &broken), source("empty", 1, &empty)],
        &store,
        settings(),
    );
    assert!(svc.ingest("general", 20, false).await.unwrap().success);
}

#[tokio::test(start_paused = true)]
async fn new_refresh_supersedes_the_running_one() {
    let store = Arc::new(MemoryStore::new());
    let slow = Arc::new(StubAdapter::returning(batch("slow", 3)).with_delay(Duration::from_secs(20)));
    let mut patient = settings();
    patient.fetch_timeout = Duration::from_secs(60);
    patient.run_budget = Duration::from_secs(120);
    let svc = Arc::new(service(vec![source("slow", 0, &slow)], &store, patient));

    let first = tokio::spawn({
        let svc = svc.clone();
        async move { svc.purge_and_refresh(48, false).await }
    });
    while !svc.refresh_in_flight() {
        tokio::task::yield_now().await;
    }

    let second = svc.purge_and_refresh(48, false).await;
    let first = first.await.unwrap();

    assert!(first.success);
    assert_eq!(first.error.as_deref(), Some("superseded by a newer run"));
    assert_eq!(first.articles_added, 0);
    assert!(second.success);
    assert!(second.error.is_none());
    assert_eq!(second.articles_added, 3);
    assert!(!svc.refresh_in_flight());
}

#[tokio::test(start_paused = true)]
async fn abandoned_refresh_frees_the_slot_and_stops_its_pipelines() {
    let store = Arc::new(MemoryStore::new());
    let slow = Arc::new(StubAdapter::returning(batch("slow", 3)).with_delay(Duration::from_secs(20)));
    let mut patient = settings();
    patient.fetch_timeout = Duration::from_secs(60);
    patient.run_budget = Duration::from_secs(120);
    let svc = Arc::new(service(vec![source("slow", 0, &slow)], &store, patient));

    let abandoned = tokio::spawn({
        let svc = svc.clone();
        async move { svc.purge_and_refresh(48, false).await }
    });
    while !svc.refresh_in_flight() {
        tokio::task::yield_now().await;
    }
    while slow.calls() == 0 {
        tokio::task::yield_now().await;
    }

    abandoned.abort();
    assert!(abandoned.await.unwrap_err().is_cancelled());
    assert!(!svc.refresh_in_flight());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn recent_logs_are_newest_first_and_capped() {
    let store = Arc::new(MemoryStore::new());
    let a = Arc::new(StubAdapter::returning(batch("a", 1)));
    let svc = service(vec![source("a", 0, &a)], &store, settings());
    for _ in 0..3 {
        svc.ingest("general", 5, false).await.unwrap();
    }

    let logs = svc.recent_logs(2).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].timestamp >= logs[1].timestamp);

    let all = svc.recent_logs(0).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn health_reflects_store_availability() {
    let store = Arc::new(MemoryStore::new());
    let svc = service(vec![], &store, settings());
    assert!(svc.health().await.is_ok());

    store.set_unavailable(true);
    assert!(matches!(svc.health().await, Err(IngestError::Store(_))));
}
