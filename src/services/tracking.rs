//! On-demand tracking lookups, optionally backed by the carrier API.
//!
//! Persistence here is opportunistic: retrieved events are copied onto the
//! matching order when one exists, and a delivery-looking event flips the
//! order to delivered, but storage failures never break the lookup itself.

use crate::{
    errors::ServiceError,
    gateways::{CarrierTrackingEvent, MelhorEnvioClient},
    services::orders::OrderService,
};
use chrono::Utc;
use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use prometheus::IntCounter;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;

lazy_static! {
    pub static ref TRACKING_LOOKUPS: IntCounter = IntCounter::new(
        "tracking_lookups_total",
        "Total number of tracking lookups served"
    )
    .expect("metric can be created");
    pub static ref TRACKING_LOOKUP_FAILURES: IntCounter = IntCounter::new(
        "tracking_lookup_failures_total",
        "Total number of carrier API lookups that failed"
    )
    .expect("metric can be created");
}

/// Correios registered-object format: two letters, nine digits, two letters.
static CORREIOS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{9}[A-Z]{2}$").unwrap());

/// Tracking history for one code, as returned to the storefront.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackingReport {
    pub tracking_code: String,
    pub carrier: String,
    pub events: Vec<CarrierTrackingEvent>,
}

/// Case-insensitive delivery sniffing over carrier-provided text.
pub(crate) fn indicates_delivery(event: &CarrierTrackingEvent) -> bool {
    let status = event.status.to_lowercase();
    let description = event.description.to_lowercase();
    status.contains("entregue")
        || status.contains("delivered")
        || description.contains("entregue")
        || description.contains("delivered")
}

fn resolve_carrier(tracking_code: &str, hint: Option<&str>) -> String {
    match hint {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ if CORREIOS_CODE.is_match(tracking_code) => "Correios".to_string(),
        _ => "Transportadora".to_string(),
    }
}

fn synthetic_posted_event() -> CarrierTrackingEvent {
    CarrierTrackingEvent {
        status: "posted".to_string(),
        description: "Objeto postado".to_string(),
        location: None,
        event_date: Utc::now(),
    }
}

#[derive(Clone)]
pub struct TrackingService {
    orders: Arc<OrderService>,
    melhor_envio: Option<MelhorEnvioClient>,
}

impl TrackingService {
    pub fn new(orders: Arc<OrderService>, melhor_envio: Option<MelhorEnvioClient>) -> Self {
        Self {
            orders,
            melhor_envio,
        }
    }

    /// Looks up a tracking code. Live events come from the carrier API when
    /// a token is configured; a Correios-shaped code with no live events
    /// gets a single synthetic "posted" placeholder. Never errors on an
    /// empty history.
    #[instrument(skip(self))]
    pub async fn track(
        &self,
        tracking_code: &str,
        carrier_hint: Option<&str>,
    ) -> Result<TrackingReport, ServiceError> {
        let tracking_code = tracking_code.trim();
        if tracking_code.is_empty() {
            return Err(ServiceError::ValidationError(
                "Código de rastreio é obrigatório".to_string(),
            ));
        }
        TRACKING_LOOKUPS.inc();

        let mut events = self.live_events(tracking_code).await;
        if events.is_empty() && CORREIOS_CODE.is_match(tracking_code) {
            events.push(synthetic_posted_event());
        }

        self.persist_events(tracking_code, &events).await;

        Ok(TrackingReport {
            tracking_code: tracking_code.to_string(),
            carrier: resolve_carrier(tracking_code, carrier_hint),
            events,
        })
    }

    async fn live_events(&self, tracking_code: &str) -> Vec<CarrierTrackingEvent> {
        let Some(client) = &self.melhor_envio else {
            return Vec::new();
        };

        match client.tracking_events(tracking_code).await {
            Ok(events) => events,
            Err(e) => {
                TRACKING_LOOKUP_FAILURES.inc();
                warn!(error = %e, "Carrier lookup failed, serving local data only");
                Vec::new()
            }
        }
    }

    /// Copies events onto the matching order and flips it to delivered when
    /// any event reads as a delivery. All best-effort.
    async fn persist_events(&self, tracking_code: &str, events: &[CarrierTrackingEvent]) {
        if events.is_empty() {
            return;
        }

        let order = match self.orders.find_by_tracking_code(tracking_code).await {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Order lookup by tracking code failed");
                return;
            }
        };

        for event in events {
            if let Err(e) = self
                .orders
                .append_tracking_event(
                    order.id,
                    &event.status,
                    &event.description,
                    event.location.clone(),
                    event.event_date,
                )
                .await
            {
                warn!(error = %e, "Failed to persist tracking event");
            }
        }

        if events.iter().any(indicates_delivery) {
            if let Err(e) = self.orders.mark_delivered(order.id).await {
                warn!(error = %e, "Failed to mark order delivered from tracking data");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(status: &str, description: &str) -> CarrierTrackingEvent {
        CarrierTrackingEvent {
            status: status.to_string(),
            description: description.to_string(),
            location: None,
            event_date: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn correios_codes_match_the_registered_format() {
        assert!(CORREIOS_CODE.is_match("AA123456789BR"));
        assert!(!CORREIOS_CODE.is_match("AA12345678BR"));
        assert!(!CORREIOS_CODE.is_match("aa123456789br"));
        assert!(!CORREIOS_CODE.is_match("ME-0001"));
    }

    #[test]
    fn delivery_is_sniffed_from_status_or_description() {
        assert!(indicates_delivery(&event("delivered", "x")));
        assert!(indicates_delivery(&event("Objeto Entregue", "x")));
        assert!(indicates_delivery(&event("done", "Entregue ao destinatário")));
        assert!(!indicates_delivery(&event("in_transit", "Em trânsito")));
    }

    #[test]
    fn carrier_hint_wins_over_inference() {
        assert_eq!(
            resolve_carrier("AA123456789BR", Some("Jadlog")),
            "Jadlog"
        );
        assert_eq!(resolve_carrier("AA123456789BR", Some("  ")), "Correios");
        assert_eq!(resolve_carrier("AA123456789BR", None), "Correios");
        assert_eq!(resolve_carrier("ME-0001", None), "Transportadora");
    }

    #[test]
    fn synthetic_fallback_is_a_posted_event() {
        let event = synthetic_posted_event();
        assert_eq!(event.status, "posted");
        assert!(event.location.is_none());
    }
}
