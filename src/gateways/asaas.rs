//! Asaas payment API client.
//!
//! Covers the two calls checkout needs: customer lookup/creation keyed on
//! email, and payment creation carrying the order id as `externalReference`
//! so the webhook can correlate it back.

use crate::errors::ServiceError;
use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

const ACCESS_TOKEN_HEADER: &str = "access_token";

/// How many days the customer has to settle a freshly created charge.
const PAYMENT_DUE_DAYS: i64 = 3;

#[derive(Clone)]
pub struct AsaasClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsaasCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsaasCustomerPage {
    #[serde(default)]
    data: Vec<AsaasCustomer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomerRequest<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpf_cnpj: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    customer: &'a str,
    billing_type: &'a str,
    value: f64,
    due_date: String,
    description: &'a str,
    external_reference: String,
}

#[derive(Debug, Deserialize)]
struct AsaasErrorBody {
    #[serde(default)]
    errors: Vec<AsaasErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct AsaasErrorEntry {
    description: String,
}

impl AsaasClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Looks up a customer by email, creating one when absent.
    #[instrument(skip(self))]
    pub async fn find_or_create_customer(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        cpf_cnpj: Option<&str>,
    ) -> Result<AsaasCustomer, ServiceError> {
        let url = format!("{}/customers", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| request_error("customer lookup", e))?;
        let response = check_status(response).await?;

        let page: AsaasCustomerPage = response
            .json()
            .await
            .map_err(|e| decode_error("customer lookup", e))?;

        if let Some(existing) = page.data.into_iter().next() {
            info!("Reusing Asaas customer {} for {}", existing.id, email);
            return Ok(existing);
        }

        let request = CreateCustomerRequest {
            name,
            email,
            phone,
            cpf_cnpj,
        };

        let response = self
            .client
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("customer creation", e))?;
        let response = check_status(response).await?;

        let created: AsaasCustomer = response
            .json()
            .await
            .map_err(|e| decode_error("customer creation", e))?;
        info!("Created Asaas customer {} for {}", created.id, email);

        Ok(created)
    }

    /// Creates a payment due in three days, tagged with the order id.
    #[instrument(skip(self, value))]
    pub async fn create_payment(
        &self,
        customer_id: &str,
        order_id: Uuid,
        value: Decimal,
        description: &str,
    ) -> Result<AsaasPayment, ServiceError> {
        let wire_value = value.to_f64().ok_or_else(|| {
            ServiceError::InternalError(format!("order total {} not representable", value))
        })?;

        let due_date = (Utc::now() + Duration::days(PAYMENT_DUE_DAYS))
            .format("%Y-%m-%d")
            .to_string();

        let request = CreatePaymentRequest {
            customer: customer_id,
            billing_type: "UNDEFINED",
            value: wire_value,
            due_date,
            description,
            external_reference: order_id.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("payment creation", e))?;
        let response = check_status(response).await?;

        let payment: AsaasPayment = response
            .json()
            .await
            .map_err(|e| decode_error("payment creation", e))?;
        info!(
            "Created Asaas payment {} for order {} (status {:?})",
            payment.id, order_id, payment.status
        );

        Ok(payment)
    }
}

fn request_error(operation: &str, err: reqwest::Error) -> ServiceError {
    error!("Asaas {} request failed: {}", operation, err);
    ServiceError::PaymentProviderError(format!("Asaas {} request failed", operation))
}

fn decode_error(operation: &str, err: reqwest::Error) -> ServiceError {
    error!("Asaas {} returned an unreadable body: {}", operation, err);
    ServiceError::PaymentProviderError(format!("Asaas {} response invalid", operation))
}

/// Extracts the provider's own error description when the call was rejected.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<AsaasErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .map(|entry| entry.description)
        .unwrap_or_else(|| format!("Asaas returned status {}", status));

    error!("Asaas API error ({}): {}", status, detail);
    Err(ServiceError::PaymentProviderError(detail))
}
