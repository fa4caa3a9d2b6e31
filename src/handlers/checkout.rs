use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use crate::AppState;

/// Storefront checkout. Every failure answers 400 with a plain `error`
/// field; the cart page renders that message directly.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    summary = "Create checkout",
    description = "Persist a pending order and return a hosted payment link",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Payment link created", body = CheckoutResponse),
        (status = 400, description = "Invalid cart or payment provider failure"),
    ),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> impl IntoResponse {
    match state.services.checkout.checkout(request).await {
        Ok(CheckoutResponse { url, order_id }) => (
            StatusCode::OK,
            Json(json!({ "url": url, "order_id": order_id })),
        ),
        Err(e) => {
            warn!(error = %e, "Checkout failed");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.response_message() })),
            )
        }
    }
}
