//! Stripe client: hosted Checkout Session creation plus webhook signature
//! verification (`t=<ts>,v1=<hex hmac>` over `"{t}.{payload}"`).

use crate::errors::ServiceError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Default window around the signature timestamp.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: u64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// One line item of a hosted checkout session. Stripe takes amounts in
/// minor units (centavos).
#[derive(Debug, Clone)]
pub struct StripeCheckoutItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: Option<StripeErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(client: reqwest::Client, base_url: String, secret_key: String) -> Self {
        Self {
            client,
            base_url,
            secret_key,
        }
    }

    /// Creates a hosted Checkout Session carrying the order id both as
    /// `client_reference_id` and in metadata.
    #[instrument(skip(self, items))]
    pub async fn create_checkout_session(
        &self,
        order_id: Uuid,
        customer_email: &str,
        items: &[StripeCheckoutItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<StripeCheckoutSession, ServiceError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("customer_email".to_string(), customer_email.to_string()),
            ("client_reference_id".to_string(), order_id.to_string()),
            ("metadata[order_id]".to_string(), order_id.to_string()),
        ];

        for (idx, item) in items.iter().enumerate() {
            form.push((
                format!("line_items[{}][quantity]", idx),
                item.quantity.to_string(),
            ));
            form.push((
                format!("line_items[{}][price_data][currency]", idx),
                "brl".to_string(),
            ));
            form.push((
                format!("line_items[{}][price_data][product_data][name]", idx),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{}][price_data][unit_amount]", idx),
                item.unit_amount_cents.to_string(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Stripe session request failed: {}", e);
                ServiceError::PaymentProviderError("Stripe session request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| format!("Stripe returned status {}", status));
            error!("Stripe API error ({}): {}", status, detail);
            return Err(ServiceError::PaymentProviderError(detail));
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            error!("Stripe session response invalid: {}", e);
            ServiceError::PaymentProviderError("Stripe session response invalid".to_string())
        })?;
        info!(
            "Created Stripe checkout session {} for order {}",
            session.id, order_id
        );

        Ok(session)
    }
}

/// Parsed `stripe-signature` header. Unknown key/value pairs are skipped for
/// forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, ServiceError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(ServiceError::BadRequest(
                    "Malformed stripe-signature header".to_string(),
                ));
            };

            match key.trim() {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        ServiceError::BadRequest(
                            "Invalid timestamp in stripe-signature header".to_string(),
                        )
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        ServiceError::BadRequest(
                            "Invalid v1 signature in stripe-signature header".to_string(),
                        )
                    })?);
                }
                _ => {}
            }
        }

        match (timestamp, v1_signature) {
            (Some(timestamp), Some(v1_signature)) => Ok(Self {
                timestamp,
                v1_signature,
            }),
            _ => Err(ServiceError::BadRequest(
                "stripe-signature header missing t= or v1=".to_string(),
            )),
        }
    }
}

/// Verifier for inbound Stripe webhook signatures.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Checks the timestamp window and the v1 HMAC in constant time.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), ServiceError> {
        let header = SignatureHeader::parse(signature_header)?;

        let age = Utc::now().timestamp() - header.timestamp;
        if age.unsigned_abs() > self.tolerance_secs {
            return Err(ServiceError::BadRequest(
                "stripe-signature timestamp outside tolerance".to_string(),
            ));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}.", header.timestamp).as_bytes());
        mac.update(payload);

        mac.verify_slice(&header.v1_signature)
            .map_err(|_| ServiceError::BadRequest("Invalid Stripe signature".to_string()))
    }
}

/// Computes the hex v1 signature for a timestamp/payload pair. Kept public
/// so webhook tests can forge valid headers.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
