//! Surface checks for the operational endpoints: banner, health, metrics
//! and the generated OpenAPI document.
mod common;

use axum::http::{Method, StatusCode};

use common::{response_json, TestApp};

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn root_serves_the_banner() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "festa-api up");
}

#[tokio::test]
async fn health_reports_an_up_database() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn metrics_expose_the_business_counters() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("checkouts_completed_total"));
    assert!(body.contains("emails_sent_total"));
    assert!(body.contains("tracking_lookups_total"));
}

#[tokio::test]
async fn openapi_document_covers_the_public_surface() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let doc = response_json(response).await;
    assert_eq!(doc["info"]["title"], "Festa Fácil API");

    let paths = doc["paths"].as_object().expect("paths object");
    for path in [
        "/api/v1/checkout",
        "/api/v1/shipping/calculate",
        "/api/v1/track-order",
        "/api/v1/webhooks/asaas",
        "/api/v1/webhooks/stripe",
        "/api/v1/webhooks/melhor-envio",
        "/api/v1/contracts",
        "/api/v1/contracts/sign",
        "/api/v1/contracts/{id}",
        "/api/v1/coupons/validate",
        "/api/v1/orders",
        "/api/v1/orders/{id}",
    ] {
        assert!(paths.contains_key(path), "OpenAPI document misses {}", path);
    }
}

#[tokio::test]
async fn unknown_routes_fall_through_to_404() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
