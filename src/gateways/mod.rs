//! Outbound HTTP integrations: payment providers, carrier tracking, email.
//!
//! Every client shares one `reqwest::Client` so connection pools and the
//! request timeout are configured in a single place.

pub mod asaas;
pub mod melhor_envio;
pub mod stripe;

pub use asaas::{AsaasClient, AsaasCustomer, AsaasPayment};
pub use melhor_envio::{CarrierTrackingEvent, MelhorEnvioClient};
pub use stripe::{StripeCheckoutItem, StripeClient, StripeWebhookVerifier};

use std::time::Duration;

/// Builds the HTTP client shared by every outbound integration.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
