//! Payment provider webhooks. Delivery is at-least-once and providers
//! retry on non-2xx, so everything that was understood answers
//! `{received:true}` even when it changed nothing. Only unreadable
//! payloads and failed verification are client errors; database failures
//! stay 5xx on purpose to trigger the provider retry.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::gateways::stripe::{StripeWebhookVerifier, DEFAULT_SIGNATURE_TOLERANCE_SECS};
use crate::notifications;
use crate::services::orders::PaymentConfirmation;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct AsaasWebhookEnvelope {
    event: String,
    #[serde(default)]
    payment: Option<AsaasWebhookPayment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasWebhookPayment {
    #[serde(default)]
    id: Option<String>,
    /// Carries the order id we handed Asaas at checkout.
    #[serde(default)]
    external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeWebhookData,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookData {
    object: StripeWebhookObject,
}

/// Shared shape over checkout sessions, payment intents and charges; only
/// the fields used to correlate back to an order.
#[derive(Debug, Deserialize)]
struct StripeWebhookObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: Option<StripeObjectMetadata>,
    #[serde(default)]
    payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeObjectMetadata {
    #[serde(default)]
    order_id: Option<String>,
}

enum PaymentSignal {
    Confirm,
    Cancel(&'static str),
    Ignore,
}

fn map_asaas_event(event: &str) -> PaymentSignal {
    match event {
        "PAYMENT_CONFIRMED" | "PAYMENT_RECEIVED" => PaymentSignal::Confirm,
        "PAYMENT_OVERDUE" => PaymentSignal::Cancel("overdue"),
        "PAYMENT_DELETED" => PaymentSignal::Cancel("deleted"),
        "PAYMENT_REFUNDED" => PaymentSignal::Cancel("refunded"),
        _ => PaymentSignal::Ignore,
    }
}

fn map_stripe_event(event_type: &str) -> PaymentSignal {
    match event_type {
        "checkout.session.completed" | "payment_intent.succeeded" => PaymentSignal::Confirm,
        "checkout.session.expired" => PaymentSignal::Cancel("expired"),
        "payment_intent.payment_failed" => PaymentSignal::Cancel("failed"),
        "charge.refunded" => PaymentSignal::Cancel("refunded"),
        _ => PaymentSignal::Ignore,
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn webhook_error_status(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        _ if e.status_code().is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/asaas",
    summary = "Asaas payment webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Unreadable payload"),
        (status = 401, description = "Invalid webhook token"),
    ),
    tag = "Webhooks"
)]
pub async fn asaas_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    match handle_asaas(&state, &headers, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))),
        Err(e) => {
            warn!(error = %e, "Asaas webhook rejected");
            (
                webhook_error_status(&e),
                Json(json!({ "error": e.response_message() })),
            )
        }
    }
}

async fn handle_asaas(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ServiceError> {
    if let Some(expected) = state.config.asaas_webhook_token.as_deref() {
        let provided = headers
            .get("asaas-access-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !constant_time_eq(expected, provided) {
            return Err(ServiceError::Unauthorized(
                "Invalid webhook token".to_string(),
            ));
        }
    }

    let envelope: AsaasWebhookEnvelope = serde_json::from_slice(body)
        .map_err(|e| ServiceError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let signal = map_asaas_event(&envelope.event);
    if matches!(signal, PaymentSignal::Ignore) {
        info!(event = %envelope.event, "Unhandled payment event, ignoring");
        return Ok(());
    }

    let Some(payment) = envelope.payment else {
        warn!(event = %envelope.event, "Payment event without a payment object");
        return Ok(());
    };
    let Some(order_id) = payment
        .external_reference
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        warn!(event = %envelope.event, "Payment event without a usable external reference");
        return Ok(());
    };

    apply_signal(state, order_id, payment.id, signal).await
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/stripe",
    summary = "Stripe payment webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Unreadable payload or failed signature check"),
    ),
    tag = "Webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    match handle_stripe(&state, &headers, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))),
        Err(e) => {
            warn!(error = %e, "Stripe webhook rejected");
            (
                webhook_error_status(&e),
                Json(json!({ "error": e.response_message() })),
            )
        }
    }
}

async fn handle_stripe(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ServiceError> {
    // Verified only when a signing secret is configured; otherwise the
    // payload is trusted as-is.
    if let Some(secret) = state.config.stripe_webhook_secret.as_deref() {
        let header = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::BadRequest("Missing stripe-signature header".to_string())
            })?;
        let tolerance = state
            .config
            .stripe_webhook_tolerance_secs
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECS);
        StripeWebhookVerifier::new(secret, tolerance).verify(body, header)?;
    }

    let envelope: StripeWebhookEnvelope = serde_json::from_slice(body)
        .map_err(|e| ServiceError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let signal = map_stripe_event(&envelope.event_type);
    if matches!(signal, PaymentSignal::Ignore) {
        info!(event = %envelope.event_type, "Unhandled payment event, ignoring");
        return Ok(());
    }

    let object = envelope.data.object;
    let order_ref = object
        .client_reference_id
        .clone()
        .or_else(|| object.metadata.as_ref().and_then(|m| m.order_id.clone()));
    let Some(order_id) = order_ref.as_deref().and_then(|raw| Uuid::parse_str(raw).ok()) else {
        warn!(event = %envelope.event_type, "Payment event without a usable order reference");
        return Ok(());
    };

    let payment_ref = object.payment_intent.or(object.id);
    apply_signal(state, order_id, payment_ref, signal).await
}

async fn apply_signal(
    state: &AppState,
    order_id: Uuid,
    payment_ref: Option<String>,
    signal: PaymentSignal,
) -> Result<(), ServiceError> {
    match signal {
        PaymentSignal::Confirm => {
            let applied = state
                .services
                .orders
                .confirm_payment(order_id, payment_ref)
                .await?;
            if let Some(confirmation) = applied {
                send_payment_emails(state, &confirmation).await;
            }
            Ok(())
        }
        PaymentSignal::Cancel(reason) => {
            state
                .services
                .orders
                .cancel_from_payment(order_id, reason)
                .await?;
            Ok(())
        }
        PaymentSignal::Ignore => Ok(()),
    }
}

/// Customer confirmation plus admin notification, both best-effort.
async fn send_payment_emails(state: &AppState, confirmation: &PaymentConfirmation) {
    let customer =
        notifications::order_confirmation_email(&confirmation.order, &confirmation.items);
    let admin = notifications::admin_order_email(
        &confirmation.admin_email,
        &confirmation.order,
        &confirmation.items,
    );

    futures::future::join(
        notifications::dispatch(state.services.mailer.as_ref(), customer),
        notifications::dispatch(state.services.mailer.as_ref(), admin),
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asaas_vocabulary_is_mapped() {
        assert!(matches!(
            map_asaas_event("PAYMENT_CONFIRMED"),
            PaymentSignal::Confirm
        ));
        assert!(matches!(
            map_asaas_event("PAYMENT_RECEIVED"),
            PaymentSignal::Confirm
        ));
        assert!(matches!(
            map_asaas_event("PAYMENT_OVERDUE"),
            PaymentSignal::Cancel("overdue")
        ));
        assert!(matches!(
            map_asaas_event("PAYMENT_CREATED"),
            PaymentSignal::Ignore
        ));
    }

    #[test]
    fn stripe_vocabulary_is_mapped() {
        assert!(matches!(
            map_stripe_event("checkout.session.completed"),
            PaymentSignal::Confirm
        ));
        assert!(matches!(
            map_stripe_event("payment_intent.succeeded"),
            PaymentSignal::Confirm
        ));
        assert!(matches!(
            map_stripe_event("checkout.session.expired"),
            PaymentSignal::Cancel("expired")
        ));
        assert!(matches!(
            map_stripe_event("charge.refunded"),
            PaymentSignal::Cancel("refunded")
        ));
        assert!(matches!(
            map_stripe_event("invoice.created"),
            PaymentSignal::Ignore
        ));
    }

    #[test]
    fn token_compare_rejects_prefixes() {
        assert!(constant_time_eq("tok_abc", "tok_abc"));
        assert!(!constant_time_eq("tok_abc", "tok_ab"));
        assert!(!constant_time_eq("tok_abc", "tok_abd"));
        assert!(!constant_time_eq("", "x"));
    }

    #[test]
    fn stripe_envelope_parses_checkout_session() {
        let raw = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_1",
                    "client_reference_id": "2d4e5f60-0000-0000-0000-000000000000",
                    "payment_intent": "pi_123",
                    "metadata": { "order_id": "2d4e5f60-0000-0000-0000-000000000000" }
                }
            }
        });
        let envelope: StripeWebhookEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.event_type, "checkout.session.completed");
        assert_eq!(envelope.data.object.payment_intent.as_deref(), Some("pi_123"));
    }

    #[test]
    fn asaas_envelope_tolerates_missing_payment() {
        let envelope: AsaasWebhookEnvelope =
            serde_json::from_str(r#"{"event":"PAYMENT_CONFIRMED"}"#).unwrap();
        assert!(envelope.payment.is_none());
    }
}
