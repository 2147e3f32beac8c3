mod common;

use alert_dispatcher::{create_app, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{router, FakeCommandService, FakePoolService};
use tower::util::ServiceExt; // for oneshot

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_returns_fixed_text() {
    let app = create_app(AppState::new(router(
        FakeCommandService::succeeding(),
        FakePoolService::single(1, 5, 3),
    )));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Healthcheck OK\n");
}

#[tokio::test]
async fn malformed_body_is_rejected_without_side_effects() {
    let commands = FakeCommandService::succeeding();
    let pools = FakePoolService::single(1, 5, 3);
    let app = create_app(AppState::new(router(commands.clone(), pools.clone())));

    let response = app
        .clone()
        .oneshot(post("/", r#"{"status": "firing", "alerts": ["#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("EOF"));

    let response = app
        .oneshot(post("/", r#"{"status": "firing", "alerts": {"labels": {}}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!body_text(response).await.is_empty());

    assert!(commands.submissions().is_empty());
    assert_eq!(pools.describes(), 0);
    assert!(pools.sets().is_empty());
}

#[tokio::test]
async fn firing_worker_up_adjusts_pool() {
    let pools = FakePoolService::single(1, 5, 3);
    let app = create_app(AppState::new(router(
        FakeCommandService::succeeding(),
        pools.clone(),
    )));

    let response = app
        .oneshot(post(
            "/",
            r#"{"status": "firing", "alerts": [{"labels": {"action": "worker-up"}}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.is_empty());
    assert_eq!(pools.sets(), vec![("workers".to_string(), 4)]);
}

#[tokio::test]
async fn null_fields_are_accepted() {
    let pools = FakePoolService::single(1, 5, 3);
    let app = create_app(AppState::new(router(
        FakeCommandService::succeeding(),
        pools.clone(),
    )));

    let response = app
        .oneshot(post(
            "/",
            r#"{"status": "firing", "groupLabels": null, "alerts": [
                {"labels": null},
                {"labels": {"action": "worker-down"}, "annotations": null}
            ]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(pools.sets(), vec![("workers".to_string(), 2)]);
}

#[tokio::test]
async fn downstream_failures_still_return_ok() {
    let commands = FakeCommandService::unreachable();
    let pools = FakePoolService::unreachable();
    let app = create_app(AppState::new(router(commands.clone(), pools.clone())));

    let response = app
        .oneshot(post(
            "/alerts",
            r#"{
                "version": "4",
                "status": "firing",
                "receiver": "dispatcher",
                "alerts": [
                    {"status": "firing", "labels": {"action": "container-up", "instance": "i-1"}},
                    {"status": "firing", "labels": {"action": "worker-down"}}
                ]
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(commands.submissions().len(), 1);
    assert_eq!(pools.describes(), 1);
}

#[tokio::test]
async fn resolved_notification_is_acknowledged() {
    let commands = FakeCommandService::succeeding();
    let pools = FakePoolService::single(1, 5, 3);
    let app = create_app(AppState::new(router(commands.clone(), pools.clone())));

    let response = app
        .oneshot(post(
            "/",
            r#"{"status": "resolved", "alerts": [{"status": "resolved", "labels": {"action": "worker-up"}}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(commands.submissions().is_empty());
    assert_eq!(pools.describes(), 0);
}
