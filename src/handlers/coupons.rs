use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    /// Cart subtotal; enables minimum-order checks and a concrete
    /// discount amount in the answer.
    pub order_amount: Option<Decimal>,
}

/// Validation never consumes a use; redemption happens at checkout.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    summary = "Validate coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon is applicable"),
        (status = 400, description = "Unknown, inactive or exhausted coupon"),
    ),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> impl IntoResponse {
    match state
        .services
        .coupons
        .validate_code(&request.code, request.order_amount)
        .await
    {
        Ok(validation) => (
            StatusCode::OK,
            Json(json!({ "success": true, "coupon": validation })),
        ),
        Err(e) => {
            let status = if e.status_code().is_server_error() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            (
                status,
                Json(json!({ "success": false, "error": e.response_message() })),
            )
        }
    }
}
