//! Admin order endpoints: paginated listing and the detail view the
//! dashboard renders, including line items and tracking history.
mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use festa_api::entities::tracking_event;

use common::{response_json, TestApp};

#[tokio::test]
async fn listing_returns_newest_orders_first() {
    let app = TestApp::new().await;
    let oldest = app.seed_order("delivered", dec!(10.00)).await;
    let middle = app.seed_order("paid", dec!(20.00)).await;
    let newest = app.seed_order("pending", dec!(30.00)).await;

    let response = app.request(Method::GET, "/api/v1/orders", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["page"], 1);
    assert_eq!(data["limit"], 20);
    assert_eq!(data["total_pages"], 1);

    let ids: Vec<String> = data["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|o| o["id"].as_str().expect("order id").to_string())
        .collect();
    assert_eq!(
        ids,
        vec![
            newest.id.to_string(),
            middle.id.to_string(),
            oldest.id.to_string()
        ]
    );
}

#[tokio::test]
async fn listing_paginates_and_reports_totals() {
    let app = TestApp::new().await;
    for _ in 0..5 {
        app.seed_order("pending", dec!(10.00)).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/orders?page=2&limit=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["items"].as_array().expect("items").len(), 2);
    assert_eq!(data["total"], 5);
    assert_eq!(data["page"], 2);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["total_pages"], 3);
}

#[tokio::test]
async fn listing_clamps_oversized_limit() {
    let app = TestApp::new().await;
    app.seed_order("pending", dec!(10.00)).await;

    let response = app
        .request(Method::GET, "/api/v1/orders?limit=5000", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["limit"], 100);
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_an_error() {
    let app = TestApp::new().await;
    app.seed_order("pending", dec!(10.00)).await;

    let response = app
        .request(Method::GET, "/api/v1/orders?page=9&limit=20", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 0);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn detail_view_bundles_items_and_tracking_history() {
    let app = TestApp::new().await;
    let order = app.seed_order("shipped", dec!(49.90)).await;
    app.seed_order_item(order.id, "Painel Redondo", 1, dec!(39.90), false)
        .await;
    app.seed_order_item(order.id, "Convite Digital", 1, dec!(10.00), true)
        .await;

    tracking_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        status: Set("posted".to_string()),
        description: Set("Objeto postado".to_string()),
        location: Set(Some("São Paulo - SP".to_string())),
        event_date: Set(Utc::now()),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed tracking event");

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["order"]["id"], order.id.to_string());
    assert_eq!(data["order"]["status"], "shipped");
    assert_eq!(data["order"]["customer_email"], "cliente@example.com");

    let items = data["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    let digital = items
        .iter()
        .find(|i| i["product_name"] == "Convite Digital")
        .expect("digital item present");
    assert_eq!(digital["is_digital"], true);
    assert_eq!(
        digital["unit_price"].as_str().map(Decimal::from_str_exact),
        Some(Ok(dec!(10.00)))
    );

    let events = data["events"].as_array().expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["description"], "Objeto postado");
    assert_eq!(events[0]["location"], "São Paulo - SP");
}

#[tokio::test]
async fn unknown_order_id_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn malformed_order_id_is_rejected_by_the_router() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders/not-a-uuid", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
