use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Service contract sent to a customer for electronic signature. The
/// signature token is a 32-char hex secret generated at creation; signing
/// requires presenting both the contract id and the token.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Option<Uuid>,

    pub customer_name: String,

    pub customer_email: String,

    pub event_date: Option<DateTime<Utc>>,

    pub content: String,

    /// "draft", "sent" or "signed"
    pub status: String,

    pub signature_token: String,

    /// Base64 image captured by the signature pad, set when signed
    pub signature_data: Option<String>,

    pub signed_at: Option<DateTime<Utc>>,

    pub signer_ip: Option<String>,

    pub signer_user_agent: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
