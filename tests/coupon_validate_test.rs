//! Public coupon validation: read-only checks, no usage consumed.

mod common;

use axum::http::Method;
use chrono::{Duration, Utc};
use common::{response_json, TestApp};
use festa_api::entities::coupon;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn valid_code_reports_discount_for_subtotal() {
    let app = TestApp::new().await;
    app.seed_coupon("FESTA10").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "festa10", "order_amount": "49.90" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["coupon"]["code"], "FESTA10");
    assert_eq!(body["coupon"]["discount_type"], "percentage");
    assert_eq!(body["coupon"]["discount_amount"], "4.99");
}

#[tokio::test]
async fn validation_without_subtotal_omits_discount_amount() {
    let app = TestApp::new().await;
    app.seed_coupon("FESTA10").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "FESTA10" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["coupon"]["discount_amount"].is_null());
}

#[tokio::test]
async fn unknown_code_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "NAOEXISTE" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Cupom não encontrado");
}

#[tokio::test]
async fn expired_coupon_is_rejected() {
    let app = TestApp::new().await;
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(None),
        code: Set("CARNAVAL24".to_string()),
        discount_type: Set("fixed".to_string()),
        discount_value: Set(dec!(15)),
        min_order_amount: Set(None),
        max_uses: Set(None),
        used_count: Set(0),
        starts_at: Set(None),
        expires_at: Set(Some(Utc::now() - Duration::days(30))),
        active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed expired coupon");

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "CARNAVAL24" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Cupom expirado");
}

#[tokio::test]
async fn exhausted_coupon_is_rejected() {
    let app = TestApp::new().await;
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(None),
        code: Set("PRIMEIRAS5".to_string()),
        discount_type: Set("percentage".to_string()),
        discount_value: Set(dec!(20)),
        min_order_amount: Set(None),
        max_uses: Set(Some(5)),
        used_count: Set(5),
        starts_at: Set(None),
        expires_at: Set(None),
        active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed exhausted coupon");

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "PRIMEIRAS5" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Cupom esgotado");
}

#[tokio::test]
async fn below_minimum_subtotal_is_rejected() {
    let app = TestApp::new().await;
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(None),
        code: Set("ACIMA100".to_string()),
        discount_type: Set("fixed".to_string()),
        discount_value: Set(dec!(10)),
        min_order_amount: Set(Some(dec!(100))),
        max_uses: Set(None),
        used_count: Set(0),
        starts_at: Set(None),
        expires_at: Set(None),
        active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("seed minimum coupon");

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "ACIMA100", "order_amount": "49.90" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("mínimo"));
}

#[tokio::test]
async fn validation_never_consumes_usage() {
    let app = TestApp::new().await;
    let seeded = app.seed_coupon("REUSAVEL").await;

    for _ in 0..3 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/coupons/validate",
                Some(json!({ "code": "REUSAVEL", "order_amount": "80.00" })),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let coupon = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.state.db)
        .await
        .expect("query coupon")
        .expect("coupon present");
    assert_eq!(coupon.used_count, 0);
}
