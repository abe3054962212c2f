use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use dockboard_inventory::test_utils::{raw_container, FakeInspector};
use dockboard_inventory::DataDir;
use dockboard_server::{create_app, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn test_background_refresh_populates_before_first_request() {
    let dir = tempfile::tempdir().unwrap();
    let data = DataDir::new(dir.path());
    let inspector = Arc::new(FakeInspector::new(vec![raw_container(
        "abc123456789def0",
        "web",
    )]));
    let state = AppState::open(&data, inspector.clone()).await.unwrap();

    let refresher = state.cache.start(Duration::from_secs(3600));
    for _ in 0..50 {
        if state.cache.current().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state.cache.current().unwrap().len(), 1);

    // Served from the populated cache without another runtime call
    let app = create_app(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/containers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(inspector.list_calls(), 1);

    refresher.stop().await;
}

#[tokio::test]
async fn test_open_keeps_existing_data() {
    let dir = tempfile::tempdir().unwrap();
    let data = DataDir::new(dir.path());
    tokio::fs::write(
        data.tags_path(),
        br##"{"abc123456789": [{"name": "prod", "color": "#ff0000"}]}"##,
    )
    .await
    .unwrap();

    let state = AppState::open(&data, Arc::new(FakeInspector::new(vec![])))
        .await
        .unwrap();
    assert_eq!(state.tags.all().await.len(), 1);
    assert!(tokio::fs::try_exists(data.credentials_path()).await.unwrap());
    assert!(tokio::fs::try_exists(data.counts_path()).await.unwrap());
}
