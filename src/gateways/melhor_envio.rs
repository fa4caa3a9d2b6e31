//! Melhor Envio tracking client.
//!
//! The tracking endpoint answers with a map keyed by the requested code;
//! each entry may carry a full event list or just a current status. Either
//! way the response is normalized into [`CarrierTrackingEvent`] values.

use crate::errors::ServiceError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

#[derive(Clone)]
pub struct MelhorEnvioClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// A carrier update normalized into the shape the tracking log stores.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CarrierTrackingEvent {
    pub status: String,
    pub description: String,
    pub location: Option<String>,
    pub event_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TrackingRequest<'a> {
    orders: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TrackingEntry {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tracking_events: Option<Vec<RawTrackingEvent>>,
    #[serde(default)]
    posted_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrackingEvent {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl MelhorEnvioClient {
    pub fn new(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Fetches and normalizes every known event for a tracking code,
    /// oldest first. An unknown code yields an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn tracking_events(
        &self,
        tracking_code: &str,
    ) -> Result<Vec<CarrierTrackingEvent>, ServiceError> {
        let request = TrackingRequest {
            orders: vec![tracking_code],
        };

        let response = self
            .client
            .post(format!("{}/me/shipment/tracking", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Melhor Envio tracking request failed: {}", e);
                ServiceError::CarrierApiError("Carrier tracking request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Melhor Envio tracking returned status {}", status);
            return Err(ServiceError::CarrierApiError(format!(
                "Carrier returned status {}",
                status
            )));
        }

        let body: HashMap<String, TrackingEntry> = response.json().await.map_err(|e| {
            error!("Melhor Envio tracking response invalid: {}", e);
            ServiceError::CarrierApiError("Carrier tracking response invalid".to_string())
        })?;

        let mut events = Vec::new();
        for entry in body.into_values() {
            let raw_events = entry.tracking_events.unwrap_or_default();
            if raw_events.is_empty() {
                // Some shipments only report an aggregate status.
                if let Some(status) = entry.status {
                    events.push(CarrierTrackingEvent {
                        status,
                        description: "Atualização da transportadora".to_string(),
                        location: None,
                        event_date: entry
                            .posted_at
                            .as_deref()
                            .map(parse_carrier_date)
                            .unwrap_or_else(Utc::now),
                    });
                }
                continue;
            }

            for raw in raw_events {
                events.push(normalize_event(raw));
            }
        }

        events.sort_by_key(|event| event.event_date);
        Ok(events)
    }
}

fn normalize_event(raw: RawTrackingEvent) -> CarrierTrackingEvent {
    let location = match (raw.city, raw.state) {
        (Some(city), Some(state)) => Some(format!("{} - {}", city, state)),
        (Some(city), None) => Some(city),
        (None, Some(state)) => Some(state),
        (None, None) => None,
    };

    CarrierTrackingEvent {
        status: raw.status.unwrap_or_else(|| "in_transit".to_string()),
        description: raw
            .description
            .unwrap_or_else(|| "Atualização da transportadora".to_string()),
        location,
        event_date: raw
            .date
            .as_deref()
            .map(parse_carrier_date)
            .unwrap_or_else(Utc::now),
    }
}

/// Carriers are inconsistent about date formats; accept RFC 3339, the
/// `YYYY-MM-DD HH:MM:SS` form, and bare dates before giving up.
pub(crate) fn parse_carrier_date(raw: &str) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    }

    warn!("Unparseable carrier event date {:?}, using now", raw);
    Utc::now()
}
