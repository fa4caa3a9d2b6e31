//! Coupon validation and redemption.
//!
//! The validity rules live in pure helpers so checkout can run them inside
//! its own transaction and the public validate endpoint can reuse them.

use crate::{
    db::DbPool,
    entities::coupon::{self, Entity as CouponEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Outcome of validating a code against an (optional) order subtotal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponValidation {
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    /// Concrete discount, present when a subtotal was supplied.
    pub discount_amount: Option<Decimal>,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Validates a code for an optional subtotal, without consuming a use.
    #[instrument(skip(self))]
    pub async fn validate_code(
        &self,
        code: &str,
        order_amount: Option<Decimal>,
    ) -> Result<CouponValidation, ServiceError> {
        let coupon = find_by_code(&*self.db, code)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Cupom não encontrado".to_string()))?;

        check_coupon(&coupon, order_amount, Utc::now())?;

        Ok(CouponValidation {
            code: coupon.code.clone(),
            discount_type: coupon.discount_type.clone(),
            discount_value: coupon.discount_value,
            discount_amount: order_amount.map(|amount| discount_amount(&coupon, amount)),
        })
    }
}

/// Case-insensitive lookup; codes are stored uppercase.
pub async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<coupon::Model>, ServiceError> {
    let normalized = code.trim().to_uppercase();

    CouponEntity::find()
        .filter(coupon::Column::Code.eq(normalized))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Pure validity rules: active flag, validity window, usage cap, minimum
/// order amount.
pub fn check_coupon(
    coupon: &coupon::Model,
    order_amount: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if !coupon.active {
        return Err(ServiceError::ValidationError(
            "Cupom inativo".to_string(),
        ));
    }

    if let Some(starts_at) = coupon.starts_at {
        if now < starts_at {
            return Err(ServiceError::ValidationError(
                "Cupom ainda não está válido".to_string(),
            ));
        }
    }

    if let Some(expires_at) = coupon.expires_at {
        if now > expires_at {
            return Err(ServiceError::ValidationError(
                "Cupom expirado".to_string(),
            ));
        }
    }

    if let Some(max_uses) = coupon.max_uses {
        if coupon.used_count >= max_uses {
            return Err(ServiceError::ValidationError(
                "Cupom esgotado".to_string(),
            ));
        }
    }

    if let (Some(min_amount), Some(amount)) = (coupon.min_order_amount, order_amount) {
        if amount < min_amount {
            return Err(ServiceError::ValidationError(format!(
                "Pedido mínimo de R$ {:.2} para este cupom",
                min_amount
            )));
        }
    }

    Ok(())
}

/// Discount for a subtotal: percentage of it, or the fixed value capped at
/// the subtotal.
pub fn discount_amount(coupon: &coupon::Model, order_amount: Decimal) -> Decimal {
    match coupon.discount_type.as_str() {
        "percentage" => (order_amount * coupon.discount_value / Decimal::from(100)).round_dp(2),
        _ => coupon.discount_value.min(order_amount),
    }
}

/// Consumes one use. Runs on whatever connection the caller supplies so
/// checkout can include it in its transaction.
pub async fn increment_usage<C: ConnectionTrait>(
    conn: &C,
    coupon: coupon::Model,
) -> Result<(), ServiceError> {
    let code = coupon.code.clone();
    let new_count = coupon.used_count + 1;

    let mut active: coupon::ActiveModel = coupon.into();
    active.used_count = Set(new_count);
    active.update(conn).await.map_err(ServiceError::DatabaseError)?;

    info!("Coupon {} usage incremented to {}", code, new_count);
    Ok(())
}
