mod common;

use axum::http::{Request, StatusCode};
use common::{broken_state, harness};
use cryptoalert::{
    models::{Direction, Subscription},
    routes,
    services::{alert_monitor::run_tick, alert_store::AlertStore},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness();
    let res = routes::app(h.state).oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_body_string(res).await, "ok");
}

#[tokio::test]
async fn health_db_reports_store_state() {
    let h = harness();
    let res = routes::app(h.state).oneshot(get("/health/db")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_body_string(res).await, "store: ok");

    let (state, _) = broken_state();
    let res = routes::app(state).oneshot(get("/health/db")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response_body_string(res).await.contains("disk unavailable"));
}

#[tokio::test]
async fn health_monitor_is_null_before_first_tick() {
    let h = harness();
    let res = routes::app(h.state).oneshot(get("/health/monitor")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_body_string(res).await, "null");
}

#[tokio::test]
async fn health_monitor_shows_last_report() {
    let h = harness();
    h.store
        .upsert(&Subscription::new(1, "BTC", 10.0, Direction::Above).unwrap())
        .await
        .unwrap();
    h.prices.set("BTC", 20.0);

    let report = run_tick(&h.state).await.unwrap();
    *h.state.last_tick.write().await = Some(report);

    let res = routes::app(h.state.clone())
        .oneshot(get("/health/monitor"))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body["subscriptions"], 1);
    assert_eq!(body["fired"], 1);
    assert_eq!(body["delivered"], 1);
}
