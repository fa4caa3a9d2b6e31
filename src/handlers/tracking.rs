use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrackOrderRequest {
    pub tracking_code: String,
    /// Optional carrier name hint, echoed back when present.
    pub carrier: Option<String>,
}

/// Live tracking lookup. An empty history is a successful answer; only a
/// missing tracking code is an error.
#[utoipa::path(
    post,
    path = "/api/v1/track-order",
    summary = "Track an order",
    description = "Fetch the tracking history for a code, live from the carrier when configured",
    request_body = TrackOrderRequest,
    responses(
        (status = 200, description = "Tracking history, possibly empty"),
        (status = 400, description = "Missing tracking code"),
    ),
    tag = "Tracking"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Json(request): Json<TrackOrderRequest>,
) -> impl IntoResponse {
    match state
        .services
        .tracking
        .track(&request.tracking_code, request.carrier.as_deref())
        .await
    {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "tracking_code": report.tracking_code,
                "events": report.events,
                "carrier": report.carrier,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.response_message() })),
        ),
    }
}
