//! Service-contract issuance and electronic signature.

use crate::{
    db::DbPool,
    entities::contract::{self, Entity as ContractEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const SIGNATURE_TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateContractRequest {
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Nome do cliente é obrigatório"))]
    pub customer_name: String,
    #[validate(email(message = "E-mail do cliente inválido"))]
    pub customer_email: String,
    pub event_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "Conteúdo do contrato é obrigatório"))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignContractRequest {
    pub contract_id: Uuid,
    /// 32 hex chars handed out with the signing link.
    pub signature_token: String,
    /// Base64 image captured by the signature pad.
    pub signature_data: String,
    pub user_agent: Option<String>,
}

fn generate_signature_token() -> String {
    let mut bytes = [0u8; SIGNATURE_TOKEN_LEN / 2];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn is_signature_token(raw: &str) -> bool {
    raw.len() == SIGNATURE_TOKEN_LEN && raw.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Clone)]
pub struct ContractService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ContractService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Issues a draft contract with a fresh signature token.
    #[instrument(skip(self, request), fields(customer_email = %request.customer_email))]
    pub async fn create(
        &self,
        request: CreateContractRequest,
    ) -> Result<contract::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let new_contract = contract::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(request.tenant_id),
            customer_name: Set(request.customer_name),
            customer_email: Set(request.customer_email),
            event_date: Set(request.event_date),
            content: Set(request.content),
            status: Set("draft".to_string()),
            signature_token: Set(generate_signature_token()),
            signature_data: Set(None),
            signed_at: Set(None),
            signer_ip: Set(None),
            signer_user_agent: Set(None),
            created_at: Set(Utc::now()),
        };

        let contract = new_contract
            .insert(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        info!(contract_id = %contract.id, "Contract created");
        Ok(contract)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<contract::Model>, ServiceError> {
        ContractEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Records an electronic signature. The contract must be addressed by
    /// id and token together; a mismatch on either reads as not found so
    /// the endpoint never confirms which half was wrong.
    #[instrument(skip(self, request), fields(contract_id = %request.contract_id))]
    pub async fn sign(
        &self,
        request: SignContractRequest,
        signer_ip: Option<String>,
    ) -> Result<contract::Model, ServiceError> {
        if !is_signature_token(&request.signature_token) {
            return Err(ServiceError::ValidationError(
                "Token de assinatura inválido".to_string(),
            ));
        }
        if request.signature_data.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Assinatura é obrigatória".to_string(),
            ));
        }

        let db = &*self.db;
        let contract = ContractEntity::find_by_id(request.contract_id)
            .filter(contract::Column::SignatureToken.eq(request.signature_token.clone()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound("Contrato não encontrado".to_string()))?;

        if contract.status == "signed" {
            return Err(ServiceError::InvalidOperation(
                "Contrato já assinado".to_string(),
            ));
        }

        let contract_id = contract.id;
        let mut active: contract::ActiveModel = contract.into();
        active.status = Set("signed".to_string());
        active.signature_data = Set(Some(request.signature_data));
        active.signed_at = Set(Some(Utc::now()));
        active.signer_ip = Set(signer_ip);
        active.signer_user_agent = Set(request.user_agent);
        let contract = active
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(contract_id = %contract_id, "Contract signed");
        if let Err(e) = self
            .event_sender
            .send(Event::ContractSigned(contract_id))
            .await
        {
            warn!(error = %e, "Failed to publish contract signed event");
        }

        Ok(contract)
    }
}
