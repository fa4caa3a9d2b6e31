use axum::{http::StatusCode, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::shipping_quote::{self, PackageDimensions, ShippingOption};

/// Weight arrives in grams, dimensions in centimeters.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CalculateShippingRequest {
    pub origin_zip: String,
    pub destination_zip: String,
    pub weight: Decimal,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

fn calculate(
    request: &CalculateShippingRequest,
) -> Result<(String, String, Vec<ShippingOption>), ServiceError> {
    let origin = shipping_quote::sanitize_zip(&request.origin_zip)?;
    let destination = shipping_quote::sanitize_zip(&request.destination_zip)?;

    let package = PackageDimensions {
        weight_grams: request.weight,
        length_cm: request.length,
        width_cm: request.width,
        height_cm: request.height,
    };
    let options = shipping_quote::quote_options(&origin, &destination, &package)?;
    Ok((origin, destination, options))
}

/// Stateless rate estimation, no carrier round-trip. The free option is
/// always present; order-total thresholds are the storefront's problem.
#[utoipa::path(
    post,
    path = "/api/v1/shipping/calculate",
    summary = "Calculate shipping options",
    description = "Estimate shipping prices and delivery windows between two CEPs",
    request_body = CalculateShippingRequest,
    responses(
        (status = 200, description = "Shipping options computed"),
        (status = 400, description = "Invalid CEP or package dimensions"),
    ),
    tag = "Shipping"
)]
pub async fn calculate_shipping(Json(request): Json<CalculateShippingRequest>) -> impl IntoResponse {
    match calculate(&request) {
        Ok((origin, destination, options)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "options": options,
                "origin_zip": origin,
                "destination_zip": destination,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.response_message() })),
        ),
    }
}
