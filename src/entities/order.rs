use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of an order.
///
/// `pending` is the state checkout leaves an order in; payment webhooks move
/// it to `paid` or `canceled`, carrier updates move it to `shipped`,
/// `delivered` or `canceled`. Stored as plain text on the row so unknown
/// provider vocabulary can never poison a write.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Option<Uuid>,

    #[validate(length(
        min = 1,
        max = 120,
        message = "Customer name must be between 1 and 120 characters"
    ))]
    pub customer_name: String,

    #[validate(email(message = "Customer email must be a valid email address"))]
    pub customer_email: String,

    pub customer_phone: Option<String>,
    pub status: String,
    pub total_amount: Decimal,

    // Shipping address, absent for digital-only orders
    pub shipping_street: Option<String>,
    pub shipping_number: Option<String>,
    pub shipping_complement: Option<String>,
    pub shipping_neighborhood: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip: Option<String>,

    /// Charge id assigned by the payment provider once checkout created it
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub tracking_code: Option<String>,
    pub notes: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::tracking_event::Entity")]
    TrackingEvent,
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::tracking_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingEvent.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if !insert {
            if let ActiveValue::NotSet = active_model.updated_at {
                active_model.updated_at = Set(Some(Utc::now()));
            }
        }
        Ok(active_model)
    }
}

impl Model {
    /// Parse the stored status text into the typed enum.
    pub fn parsed_status(&self) -> Result<OrderStatus, crate::errors::ServiceError> {
        self.status.parse::<OrderStatus>().map_err(|_| {
            crate::errors::ServiceError::InvalidStatus(format!(
                "Order {} carries unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            let text = status.as_str();
            assert_eq!(text.parse::<OrderStatus>().unwrap(), status);
            assert_eq!(status.to_string(), text);
        }
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert!("refunded-ish".parse::<OrderStatus>().is_err());
    }
}
