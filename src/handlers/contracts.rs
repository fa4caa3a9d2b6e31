use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::contract;
use crate::notifications;
use crate::services::contracts::{CreateContractRequest, SignContractRequest};
use crate::AppState;

/// Contract as exposed over HTTP. The signature token never leaves the
/// create response; the signed image stays server-side entirely.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContractView {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub event_date: Option<DateTime<Utc>>,
    pub content: String,
    pub status: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&contract::Model> for ContractView {
    fn from(model: &contract::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            customer_name: model.customer_name.clone(),
            customer_email: model.customer_email.clone(),
            event_date: model.event_date,
            content: model.content.clone(),
            status: model.status.clone(),
            signed_at: model.signed_at,
            created_at: model.created_at,
        }
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    summary = "Create contract",
    description = "Issue a draft contract and its signing token",
    request_body = CreateContractRequest,
    responses(
        (status = 201, description = "Contract created"),
        (status = 400, description = "Invalid contract data"),
    ),
    tag = "Contracts"
)]
pub async fn create_contract(
    State(state): State<AppState>,
    Json(request): Json<CreateContractRequest>,
) -> impl IntoResponse {
    match state.services.contracts.create(request).await {
        Ok(contract) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "contract": ContractView::from(&contract),
                // Handed out once so the caller can build the signing link.
                "signature_token": contract.signature_token,
            })),
        ),
        Err(e) => (
            e.status_code(),
            Json(json!({ "error": e.response_message() })),
        ),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contracts/{id}",
    summary = "Get contract",
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "Contract found", body = ContractView),
        (status = 404, description = "Contract not found"),
    ),
    tag = "Contracts"
)]
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.services.contracts.get(id).await {
        Ok(Some(contract)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "contract": ContractView::from(&contract) })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Contrato não encontrado" })),
        ),
        Err(e) => (
            e.status_code(),
            Json(json!({ "error": e.response_message() })),
        ),
    }
}

/// Electronic signature. Requires the contract id plus the secret token
/// from the signing link; a mismatch on either answers 404.
#[utoipa::path(
    post,
    path = "/api/v1/contracts/sign",
    summary = "Sign contract",
    request_body = SignContractRequest,
    responses(
        (status = 200, description = "Contract signed"),
        (status = 400, description = "Invalid token format or contract already signed"),
        (status = 404, description = "Contract and token do not match"),
    ),
    tag = "Contracts"
)]
pub async fn sign_contract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignContractRequest>,
) -> impl IntoResponse {
    let signer_ip = client_ip(&headers);

    match state.services.contracts.sign(request, signer_ip).await {
        Ok(contract) => {
            notifications::dispatch(
                state.services.mailer.as_ref(),
                notifications::contract_signed_email(&contract),
            )
            .await;

            (
                StatusCode::OK,
                Json(json!({ "success": true, "contract": ContractView::from(&contract) })),
            )
        }
        Err(e) => {
            warn!(error = %e, "Contract signing failed");
            (
                e.status_code(),
                Json(json!({ "error": e.response_message() })),
            )
        }
    }
}
