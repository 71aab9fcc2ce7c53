//! HttpBackend against a mockito server.

use std::sync::Arc;
use std::time::Duration;

use dailydraw_core::broadcast::NoopSink;
use dailydraw_core::{
    BackendError, BackendSettings, Broadcaster, EntryLoader, EntrySource, EntryStatus, HttpBackend,
    LoaderSettings, NotificationKind, WinnerSelector,
};

const ENTRIES: &str = r#"[
    {"id":"1","imageRef":"uploads/1.jpg","description":"Harbour at dusk","ownerRef":"u-1","uploadedAt":"2026-06-01T18:00:00Z"},
    {"id":"2","imageRef":"uploads/2.jpg","description":"Rooftops","ownerRef":"u-2","uploadedAt":"2026-06-01T18:30:00Z","isWinner":false}
]"#;

fn backend_for(server: &mockito::ServerGuard) -> HttpBackend {
    let settings = BackendSettings {
        base_url: server.url(),
        request_timeout: Duration::from_secs(5),
        ..BackendSettings::default()
    };
    HttpBackend::new(&settings).unwrap()
}

#[tokio::test]
async fn fetches_current_entries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/entries/current")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ENTRIES)
        .create_async()
        .await;

    let entries = backend_for(&server).fetch_entries().await.unwrap();
    mock.assert_async().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].description, "Harbour at dusk");
    assert!(entries.iter().all(|e| e.status == EntryStatus::Pending));
}

#[tokio::test]
async fn trigger_draw_posts_once_and_returns_winner() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/draw/trigger")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"winnerId":"2","imageRef":"uploads/2.jpg","description":"Rooftops","ownerRef":"u-2","uploadedAt":"2026-06-01T18:30:00Z"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let winner = backend_for(&server).trigger_draw().await.unwrap();
    mock.assert_async().await;
    assert_eq!(winner.id, "2");
    assert!(winner.is_winner());
}

#[tokio::test]
async fn non_success_status_keeps_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/draw/trigger")
        .with_status(409)
        .with_body("draw already running")
        .create_async()
        .await;

    let err = backend_for(&server).trigger_draw().await.unwrap_err();
    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 409);
            assert_eq!(body, "draw already running");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/entries/current")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"not":"a list"}"#)
        .create_async()
        .await;

    let err = backend_for(&server).fetch_entries().await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn loader_reports_exhaustion_once_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/entries/current")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let broadcaster = Broadcaster::new(Box::new(NoopSink));
    let settings = LoaderSettings {
        max_attempts: 2,
        backoff_base: Duration::from_millis(10),
    };
    let mut loader = EntryLoader::new(Arc::new(backend_for(&server)), settings, broadcaster.clone());

    assert!(loader.load().await.is_empty());
    assert!(loader.load().await.is_empty());
    mock.assert_async().await;

    let failure = loader.failure().expect("sticky failure");
    assert_eq!(failure.attempts, 2);
    let errors = broadcaster
        .history()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::Error)
        .count();
    assert_eq!(errors, 1);
}
