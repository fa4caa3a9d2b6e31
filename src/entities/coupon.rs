use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discount code. `discount_type` is "percentage" or "fixed"; usage is
/// consumed at checkout, not at validation time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Option<Uuid>,

    #[sea_orm(unique)]
    pub code: String,

    pub discount_type: String,

    pub discount_value: Decimal,

    pub min_order_amount: Option<Decimal>,

    pub max_uses: Option<i32>,

    pub used_count: i32,

    pub starts_at: Option<DateTime<Utc>>,

    pub expires_at: Option<DateTime<Utc>>,

    pub active: bool,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
