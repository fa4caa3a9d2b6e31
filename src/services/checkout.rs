//! Checkout turns a cart into a pending order plus a hosted payment link.
//!
//! The order, its line items and the coupon redemption commit in one
//! transaction; the payment-provider call happens after the commit. A
//! provider failure leaves a pending order with no payment link behind,
//! and pending orders are never fulfilled.

use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    gateways::{AsaasClient, StripeCheckoutItem, StripeClient},
    services::coupons,
};
use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    pub static ref CHECKOUTS_COMPLETED: IntCounter = IntCounter::new(
        "checkouts_completed_total",
        "Total number of checkouts that produced a payment link"
    )
    .expect("metric can be created");
    pub static ref CHECKOUT_FAILURES: IntCounter = IntCounter::new(
        "checkout_failures_total",
        "Total number of checkouts that failed after the order was persisted"
    )
    .expect("metric can be created");
}

/// Digital line items must receive their personalization data within this
/// window. Fixed business rule.
pub const CUSTOMIZATION_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartItemInput {
    /// Catalog product id. Free-form so carts can sell ad-hoc items; only
    /// values that parse as UUIDs are linked back to the catalog.
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Nome do item é obrigatório"))]
    pub name: String,
    pub price: Decimal,
    #[validate(range(min = 1, message = "Quantidade deve ser ao menos 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub is_digital: bool,
    pub customization: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(length(min = 1, message = "Nome do cliente é obrigatório"))]
    pub name: String,
    #[validate(email(message = "E-mail do cliente inválido"))]
    pub email: String,
    pub phone: Option<String>,
    #[serde(rename = "cpfCnpj")]
    pub cpf_cnpj: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShippingAddressInput {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Carrinho vazio"))]
    pub items: Vec<CartItemInput>,
    #[validate]
    pub customer: CustomerInput,
    pub shipping: Option<ShippingAddressInput>,
    pub notes: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub coupon: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Hosted payment page the storefront redirects the customer to.
    pub url: String,
    pub order_id: Uuid,
}

/// Order totals are fixed at creation time and never recomputed.
pub(crate) fn cart_total(items: &[CartItemInput]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

fn payment_description(items: &[CartItemInput]) -> String {
    let names = items
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let description = format!("Pedido Festa Fácil: {}", names);
    if description.chars().count() > 200 {
        let mut truncated: String = description.chars().take(197).collect();
        truncated.push_str("...");
        truncated
    } else {
        description
    }
}

fn stripe_line_items(items: &[CartItemInput]) -> Result<Vec<StripeCheckoutItem>, ServiceError> {
    items
        .iter()
        .map(|item| {
            let cents = (item.price * dec!(100)).round_dp(0).to_i64().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "price {} not representable in centavos",
                    item.price
                ))
            })?;
            Ok(StripeCheckoutItem {
                name: item.name.clone(),
                unit_amount_cents: cents,
                quantity: item.quantity,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    asaas: Option<AsaasClient>,
    stripe: Option<StripeClient>,
    success_url: String,
    cancel_url: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        asaas: Option<AsaasClient>,
        stripe: Option<StripeClient>,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            asaas,
            stripe,
            success_url,
            cancel_url,
        }
    }

    /// Persists the order and asks a provider for a payment link. Asaas is
    /// the primary provider, Stripe the fallback. No compensating
    /// transaction: a provider error after the commit leaves the order
    /// pending.
    #[instrument(skip(self, request), fields(customer_email = %request.customer.email))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for item in &request.items {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        }

        let db = &*self.db;
        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let total = cart_total(&request.items);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        let redeemed = match request.coupon.as_deref() {
            Some(code) => {
                let coupon = coupons::find_by_code(&txn, code).await?.ok_or_else(|| {
                    ServiceError::ValidationError("Cupom não encontrado".to_string())
                })?;
                coupons::check_coupon(&coupon, Some(total), now)?;
                Some(coupon)
            }
            None => None,
        };
        let coupon_event = redeemed.as_ref().map(|c| (c.id, c.code.clone()));

        let shipping = request.shipping.clone().unwrap_or_default();
        let new_order = order::ActiveModel {
            id: Set(order_id),
            tenant_id: Set(request.tenant_id),
            customer_name: Set(request.customer.name.clone()),
            customer_email: Set(request.customer.email.clone()),
            customer_phone: Set(request.customer.phone.clone()),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            total_amount: Set(total),
            shipping_street: Set(shipping.street),
            shipping_number: Set(shipping.number),
            shipping_complement: Set(shipping.complement),
            shipping_neighborhood: Set(shipping.neighborhood),
            shipping_city: Set(shipping.city),
            shipping_state: Set(shipping.state),
            shipping_zip: Set(shipping.zip),
            payment_id: Set(None),
            coupon_code: Set(redeemed.as_ref().map(|c| c.code.clone())),
            tracking_code: Set(None),
            notes: Set(request.notes.clone()),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };
        new_order.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        for item in &request.items {
            let (customization_status, customization_deadline) = if item.is_digital {
                (
                    Some("pending_info".to_string()),
                    Some(now + Duration::days(CUSTOMIZATION_WINDOW_DAYS)),
                )
            } else {
                (None, None)
            };

            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item
                    .id
                    .as_deref()
                    .and_then(|raw| Uuid::parse_str(raw).ok())),
                product_name: Set(item.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.price),
                total_price: Set(item.price * Decimal::from(item.quantity)),
                is_digital: Set(item.is_digital),
                customization_data: Set(item.customization.clone()),
                customization_status: Set(customization_status),
                customization_deadline: Set(customization_deadline),
                created_at: Set(now),
            };
            line.insert(&txn).await.map_err(|e| {
                error!(error = %e, "Failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
        }

        if let Some(coupon) = redeemed {
            coupons::increment_usage(&txn, coupon).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit checkout transaction");
            ServiceError::DatabaseError(e)
        })?;
        info!(order_id = %order_id, total = %total, "Order persisted as pending");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(error = %e, "Failed to publish order created event");
        }
        if let Some((coupon_id, code)) = coupon_event {
            if let Err(e) = self
                .event_sender
                .send(Event::CouponRedeemed {
                    coupon_id,
                    order_id,
                    code,
                })
                .await
            {
                warn!(error = %e, "Failed to publish coupon redeemed event");
            }
        }

        match self.request_payment_link(order_id, &request, total).await {
            Ok(url) => {
                CHECKOUTS_COMPLETED.inc();
                Ok(CheckoutResponse { url, order_id })
            }
            Err(e) => {
                CHECKOUT_FAILURES.inc();
                error!(order_id = %order_id, error = %e, "Payment link creation failed, order stays pending");
                Err(e)
            }
        }
    }

    async fn request_payment_link(
        &self,
        order_id: Uuid,
        request: &CheckoutRequest,
        total: Decimal,
    ) -> Result<String, ServiceError> {
        if let Some(asaas) = &self.asaas {
            let customer = asaas
                .find_or_create_customer(
                    &request.customer.name,
                    &request.customer.email,
                    request.customer.phone.as_deref(),
                    request.customer.cpf_cnpj.as_deref(),
                )
                .await?;
            let payment = asaas
                .create_payment(
                    &customer.id,
                    order_id,
                    total,
                    &payment_description(&request.items),
                )
                .await?;
            self.store_payment_reference(order_id, payment.id).await?;
            return payment.invoice_url.ok_or_else(|| {
                ServiceError::PaymentProviderError(
                    "Asaas did not return an invoice URL".to_string(),
                )
            });
        }

        if let Some(stripe) = &self.stripe {
            let items = stripe_line_items(&request.items)?;
            let session = stripe
                .create_checkout_session(
                    order_id,
                    &request.customer.email,
                    &items,
                    &self.success_url,
                    &self.cancel_url,
                )
                .await?;
            self.store_payment_reference(order_id, session.id).await?;
            return session.url.ok_or_else(|| {
                ServiceError::PaymentProviderError(
                    "Stripe did not return a checkout URL".to_string(),
                )
            });
        }

        Err(ServiceError::PaymentProviderError(
            "No payment provider configured".to_string(),
        ))
    }

    /// Stores the provider charge id. Deliberately outside the checkout
    /// transaction: the order must survive even when this write fails.
    async fn store_payment_reference(
        &self,
        order_id: Uuid,
        reference: String,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut active: order::ActiveModel = order.into();
        active.payment_id = Set(Some(reference));
        active
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(())
    }
}
