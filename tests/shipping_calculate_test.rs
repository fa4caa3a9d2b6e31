//! Shipping calculator endpoint: stateless quotes from CEP pairs and
//! package dimensions, no carrier round-trip involved.
mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{response_json, TestApp};

fn quote_payload(origin: &str, destination: &str) -> Value {
    json!({
        "origin_zip": origin,
        "destination_zip": destination,
        "weight": 500,
        "length": 30,
        "width": 20,
        "height": 10,
    })
}

fn service_codes(body: &Value) -> Vec<String> {
    body["options"]
        .as_array()
        .expect("options array")
        .iter()
        .map(|o| o["service"].as_str().expect("service code").to_string())
        .collect()
}

#[tokio::test]
async fn nearby_ceps_get_the_full_menu_including_motoboy() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/shipping/calculate",
            Some(quote_payload("01310-100", "04538-133")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["origin_zip"], "01310100");
    assert_eq!(body["destination_zip"], "04538133");

    let services = service_codes(&body);
    assert_eq!(services, vec!["sedex", "pac", "motoboy", "free"]);
}

#[tokio::test]
async fn same_city_quote_prices_the_fixed_tariff() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/shipping/calculate",
            Some(quote_payload("01310-100", "01310-100")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let options = body["options"].as_array().expect("options");
    let by_service = |code: &str| {
        options
            .iter()
            .find(|o| o["service"] == code)
            .unwrap_or_else(|| panic!("missing option {}", code))
    };

    // 500g in a 30x20x10 box: volumetric 1kg wins, base floors at R$5.00
    assert_eq!(by_service("sedex")["price"], "9.75");
    assert_eq!(by_service("sedex")["delivery_range"], json!({"min": 1, "max": 2}));
    assert_eq!(by_service("pac")["price"], "6.00");
    assert_eq!(by_service("motoboy")["price"], "12.50");
    assert_eq!(by_service("free")["price"], "0");
}

#[tokio::test]
async fn distant_ceps_drop_motoboy_and_widen_the_windows() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/shipping/calculate",
            Some(quote_payload("01310-100", "69000-000")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let services = service_codes(&body);
    assert_eq!(services, vec!["sedex", "pac", "free"]);

    let free = body["options"]
        .as_array()
        .expect("options")
        .iter()
        .find(|o| o["service"] == "free")
        .expect("free option");
    assert_eq!(free["delivery_range"], json!({"min": 16, "max": 22}));
}

#[tokio::test]
async fn malformed_cep_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/shipping/calculate",
            Some(quote_payload("1234", "04538-133")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("CEP inválido"),
        "unexpected error: {}",
        body["error"]
    );
}

#[tokio::test]
async fn zero_weight_is_rejected() {
    let app = TestApp::new().await;

    let mut payload = quote_payload("01310-100", "04538-133");
    payload["weight"] = json!(0);

    let response = app
        .request(Method::POST, "/api/v1/shipping/calculate", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("positivos"),
        "unexpected error: {}",
        body["error"]
    );
}

#[tokio::test]
async fn heavier_package_never_quotes_cheaper() {
    let app = TestApp::new().await;

    let mut heavy = quote_payload("01310-100", "69000-000");
    heavy["weight"] = json!(8000);

    let light_body = response_json(
        app.request(
            Method::POST,
            "/api/v1/shipping/calculate",
            Some(quote_payload("01310-100", "69000-000")),
        )
        .await,
    )
    .await;
    let heavy_body = response_json(
        app.request(Method::POST, "/api/v1/shipping/calculate", Some(heavy))
            .await,
    )
    .await;

    let sedex_price = |body: &Value| {
        body["options"]
            .as_array()
            .expect("options")
            .iter()
            .find(|o| o["service"] == "sedex")
            .and_then(|o| o["price"].as_str())
            .and_then(|p| p.parse::<rust_decimal::Decimal>().ok())
            .expect("sedex price")
    };

    assert!(sedex_price(&heavy_body) > sedex_price(&light_body));
}
