//! Carrier tracking callbacks (Melhor Envio).
//!
//! Tolerant by contract: an unknown tracking code is a successful no-op,
//! because the carrier also notifies about shipments this system never
//! created. Validation errors answer 400, storage failures 500 so the
//! carrier retries.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::gateways::melhor_envio::parse_carrier_date;
use crate::notifications;
use crate::services::orders::{CarrierCallback, CarrierUpdate};
use crate::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CarrierWebhookRequest {
    pub event: String,
    pub tracking_code: String,
    pub status: Option<String>,
    pub description: Option<String>,
    /// Carrier timestamps arrive in several shapes; parsed leniently.
    pub date: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

fn location_from(city: Option<String>, state: Option<String>) -> Option<String> {
    match (city, state) {
        (Some(city), Some(state)) => Some(format!("{} - {}", city, state)),
        (Some(city), None) => Some(city),
        (None, Some(state)) => Some(state),
        (None, None) => None,
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/melhor-envio",
    summary = "Carrier tracking webhook",
    request_body = CarrierWebhookRequest,
    responses(
        (status = 200, description = "Event recorded or tolerated"),
        (status = 400, description = "Missing event or tracking code"),
        (status = 500, description = "Storage failure, carrier should retry"),
    ),
    tag = "Webhooks"
)]
pub async fn melhor_envio_webhook(
    State(state): State<AppState>,
    Json(request): Json<CarrierWebhookRequest>,
) -> impl IntoResponse {
    match handle_carrier_event(&state, request).await {
        Ok(message) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": message })),
        ),
        Err(e) => {
            warn!(error = %e, "Carrier webhook rejected");
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

async fn handle_carrier_event(
    state: &AppState,
    request: CarrierWebhookRequest,
) -> Result<String, ServiceError> {
    if request.event.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Evento é obrigatório".to_string(),
        ));
    }
    if request.tracking_code.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Código de rastreio é obrigatório".to_string(),
        ));
    }

    let callback = CarrierCallback {
        event: request.event.trim().to_string(),
        tracking_code: request.tracking_code.trim().to_string(),
        status: request.status,
        description: request.description,
        date: request.date.as_deref().map(parse_carrier_date),
        location: location_from(request.city, request.state),
    };

    match state.services.orders.apply_carrier_callback(callback).await? {
        CarrierUpdate::UnknownTrackingCode => {
            Ok("Código de rastreio desconhecido, nada a fazer".to_string())
        }
        CarrierUpdate::Applied {
            order,
            status_changed,
            delivered,
        } => {
            if delivered {
                notifications::dispatch(
                    state.services.mailer.as_ref(),
                    notifications::delivery_email(&order),
                )
                .await;
            }

            if status_changed {
                Ok(format!("Pedido atualizado para {}", order.status))
            } else {
                Ok("Evento registrado".to_string())
            }
        }
    }
}
