//! Order queries plus the webhook-driven state transitions.
//!
//! Payment and carrier callbacks both land here: provider vocabularies are
//! already mapped by the handlers, this service owns what the transitions
//! write. Webhook paths use individual statements rather than one large
//! transaction; the status column is the source of truth and notification
//! side effects are layered on top, best-effort.

use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        product_review::{self, Entity as ProductReviewEntity},
        tenant::Entity as TenantEntity,
        tracking_event::{self, Entity as TrackingEventEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::ADMIN_FALLBACK_EMAIL,
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

lazy_static! {
    pub static ref PAYMENT_EVENTS_APPLIED: IntCounter = IntCounter::new(
        "payment_events_applied_total",
        "Total number of payment webhook events that changed an order"
    )
    .expect("metric can be created");
    pub static ref PAYMENT_EVENTS_IGNORED: IntCounter = IntCounter::new(
        "payment_events_ignored_total",
        "Total number of payment webhook events ignored"
    )
    .expect("metric can be created");
    pub static ref CARRIER_EVENTS_RECORDED: IntCounter = IntCounter::new(
        "carrier_events_recorded_total",
        "Total number of carrier tracking events recorded"
    )
    .expect("metric can be created");
}

/// Order with its line items and tracking history.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub events: Vec<tracking_event::Model>,
}

/// One page of orders.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Everything the payment webhook needs to fire notifications after a
/// confirmation has been applied.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub admin_email: String,
    /// True when this was a re-delivery for an order already paid.
    pub already_paid: bool,
}

/// Inbound carrier callback after transport-level parsing.
#[derive(Debug, Clone)]
pub struct CarrierCallback {
    pub event: String,
    pub tracking_code: String,
    pub status: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// What a carrier callback did to an order.
#[derive(Debug, Clone)]
pub enum CarrierUpdate {
    /// No order carries this tracking code; nothing was written.
    UnknownTrackingCode,
    Applied {
        order: order::Model,
        status_changed: bool,
        delivered: bool,
    },
}

/// Carrier vocabulary to internal status. Unknown events map to `None`:
/// they are still recorded in the tracking log but never move the order.
pub fn map_carrier_event(event: &str) -> Option<OrderStatus> {
    match event {
        "posted" | "in_transit" | "out_for_delivery" => Some(OrderStatus::Shipped),
        "delivered" => Some(OrderStatus::Delivered),
        "returned" | "canceled" => Some(OrderStatus::Canceled),
        _ => None,
    }
}

/// Fallback description used when the carrier sends none.
pub fn default_event_description(event: &str) -> String {
    match event {
        "posted" => "Objeto postado".to_string(),
        "in_transit" => "Objeto em trânsito".to_string(),
        "out_for_delivery" => "Objeto saiu para entrega".to_string(),
        "delivered" => "Objeto entregue ao destinatário".to_string(),
        "returned" => "Objeto devolvido ao remetente".to_string(),
        "canceled" => "Envio cancelado".to_string(),
        other => format!("Atualização da transportadora: {}", other),
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Loads an order with its items and tracking history.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderDetails>, ServiceError> {
        let db = &*self.db;

        let Some(order) = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let events = TrackingEventEntity::find()
            .filter(tracking_event::Column::OrderId.eq(order_id))
            .order_by_asc(tracking_event::Column::EventDate)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some(OrderDetails {
            order,
            items,
            events,
        }))
    }

    /// Lists orders newest first, paginated. Pages are 1-based.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, page: u64, per_page: u64) -> Result<OrderPage, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let orders = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_tracking_code(
        &self,
        tracking_code: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::TrackingCode.eq(tracking_code))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Appends a tracking event unless one already exists for the same
    /// order and instant. Returns whether a row was inserted.
    #[instrument(skip(self, description, location), fields(order_id = %order_id, status = %status))]
    pub async fn append_tracking_event(
        &self,
        order_id: Uuid,
        status: &str,
        description: &str,
        location: Option<String>,
        event_date: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db;

        let existing = TrackingEventEntity::find()
            .filter(tracking_event::Column::OrderId.eq(order_id))
            .filter(tracking_event::Column::EventDate.eq(event_date))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            info!("Tracking event at {} already recorded, skipping", event_date);
            return Ok(false);
        }

        let event = tracking_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(status.to_string()),
            description: Set(description.to_string()),
            location: Set(location),
            event_date: Set(event_date),
            created_at: Set(Utc::now()),
        };
        event.insert(db).await.map_err(ServiceError::DatabaseError)?;

        if let Err(e) = self
            .event_sender
            .send(Event::TrackingEventRecorded {
                order_id,
                status: status.to_string(),
                event_date,
            })
            .await
        {
            warn!(error = %e, "Failed to publish tracking event");
        }

        Ok(true)
    }

    /// Applies a payment confirmation: moves a pending order to paid,
    /// stores the provider reference, appends the confirmation to the
    /// tracking log, marks matching reviews as verified purchases and
    /// resolves the admin notification address.
    ///
    /// Re-deliveries repeat the tracking-event append and hand the caller
    /// fresh notification data; only the status write is idempotent.
    #[instrument(skip(self, payment_ref), fields(order_id = %order_id))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        payment_ref: Option<String>,
    ) -> Result<Option<PaymentConfirmation>, ServiceError> {
        let db = &*self.db;

        let Some(order) = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            warn!("Payment confirmation for unknown order {}", order_id);
            PAYMENT_EVENTS_IGNORED.inc();
            return Ok(None);
        };

        let current = order.parsed_status()?;

        if current == OrderStatus::Canceled {
            warn!(
                "Ignoring payment confirmation for canceled order {}",
                order_id
            );
            PAYMENT_EVENTS_IGNORED.inc();
            return Ok(None);
        }

        let already_paid = current != OrderStatus::Pending;
        let old_status = order.status.clone();

        let order = if current == OrderStatus::Pending || payment_ref.is_some() {
            let mut active: order::ActiveModel = order.into();
            if current == OrderStatus::Pending {
                active.status = Set(OrderStatus::Paid.as_str().to_string());
            }
            if let Some(reference) = payment_ref {
                active.payment_id = Set(Some(reference));
            }
            active.updated_at = Set(Some(Utc::now()));
            active
                .update(db)
                .await
                .map_err(ServiceError::DatabaseError)?
        } else {
            order
        };

        if !already_paid {
            info!(order_id = %order_id, "Order confirmed as paid");
            if let Err(e) = self.event_sender.send(Event::OrderPaid(order_id)).await {
                warn!(error = %e, "Failed to publish order paid event");
            }
            if let Err(e) = self
                .event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: OrderStatus::Paid.as_str().to_string(),
                })
                .await
            {
                warn!(error = %e, "Failed to publish status change event");
            }
        } else {
            info!(order_id = %order_id, "Duplicate payment confirmation, side effects repeat");
        }

        self.append_tracking_event(
            order_id,
            "payment_confirmed",
            "Pagamento confirmado",
            None,
            Utc::now(),
        )
        .await?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.mark_reviews_verified(&order, &items).await;
        let admin_email = self.resolve_admin_email(order.tenant_id).await;

        PAYMENT_EVENTS_APPLIED.inc();

        Ok(Some(PaymentConfirmation {
            order,
            items,
            admin_email,
            already_paid,
        }))
    }

    /// Cancels an order off the back of a payment failure, refund or
    /// expiry. Only pending and paid orders move; later states stay put.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_from_payment(
        &self,
        order_id: Uuid,
        reason: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let db = &*self.db;

        let Some(order) = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            warn!("Payment cancellation for unknown order {}", order_id);
            PAYMENT_EVENTS_IGNORED.inc();
            return Ok(None);
        };

        let current = order.parsed_status()?;
        if !matches!(current, OrderStatus::Pending | OrderStatus::Paid) {
            warn!(
                "Order {} is {} and cannot be canceled by a payment event",
                order_id, current
            );
            PAYMENT_EVENTS_IGNORED.inc();
            return Ok(Some(order));
        }

        let old_status = order.status.clone();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Canceled.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        let order = active
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, reason = reason, "Order canceled by payment provider event");
        PAYMENT_EVENTS_APPLIED.inc();

        if let Err(e) = self.event_sender.send(Event::OrderCanceled(order_id)).await {
            warn!(error = %e, "Failed to publish order canceled event");
        }
        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: OrderStatus::Canceled.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, "Failed to publish status change event");
        }

        Ok(Some(order))
    }

    /// Applies one carrier callback: always records the tracking event,
    /// moves the order only when the mapped status differs, stamps
    /// `delivered_at` on delivery.
    #[instrument(skip(self, callback), fields(tracking_code = %callback.tracking_code, event = %callback.event))]
    pub async fn apply_carrier_callback(
        &self,
        callback: CarrierCallback,
    ) -> Result<CarrierUpdate, ServiceError> {
        let Some(order) = self.find_by_tracking_code(&callback.tracking_code).await? else {
            info!(
                "Carrier callback for unknown tracking code {}, ignoring",
                callback.tracking_code
            );
            return Ok(CarrierUpdate::UnknownTrackingCode);
        };

        let mapped = map_carrier_event(&callback.event);
        let event_date = callback.date.unwrap_or_else(Utc::now);
        let status_label = callback
            .status
            .clone()
            .unwrap_or_else(|| callback.event.clone());
        let description = callback
            .description
            .clone()
            .unwrap_or_else(|| default_event_description(&callback.event));

        let inserted = self
            .append_tracking_event(
                order.id,
                &status_label,
                &description,
                callback.location.clone(),
                event_date,
            )
            .await?;
        if inserted {
            CARRIER_EVENTS_RECORDED.inc();
        }

        let current = order.parsed_status()?;
        let delivered = mapped == Some(OrderStatus::Delivered);

        let (order, status_changed) = match mapped {
            Some(target) if target != current => {
                let order = self.transition_order(order, target).await?;
                (order, true)
            }
            _ => (order, false),
        };

        Ok(CarrierUpdate::Applied {
            order,
            status_changed,
            delivered,
        })
    }

    /// Moves an order to delivered with a timestamp. No-op if it already
    /// is.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_delivered(
        &self,
        order_id: Uuid,
    ) -> Result<Option<order::Model>, ServiceError> {
        let Some(order) = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        if order.parsed_status()? == OrderStatus::Delivered {
            return Ok(Some(order));
        }

        let order = self.transition_order(order, OrderStatus::Delivered).await?;
        Ok(Some(order))
    }

    async fn transition_order(
        &self,
        order: order::Model,
        target: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order_id = order.id;
        let old_status = order.status.clone();

        let mut active: order::ActiveModel = order.into();
        active.status = Set(target.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        if target == OrderStatus::Delivered {
            active.delivered_at = Set(Some(Utc::now()));
        }
        let order = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %target, "Order status updated");

        let lifecycle_event = match target {
            OrderStatus::Shipped => Some(Event::OrderShipped(order_id)),
            OrderStatus::Delivered => Some(Event::OrderDelivered(order_id)),
            OrderStatus::Canceled => Some(Event::OrderCanceled(order_id)),
            OrderStatus::Paid => Some(Event::OrderPaid(order_id)),
            OrderStatus::Pending => None,
        };
        if let Some(event) = lifecycle_event {
            if let Err(e) = self.event_sender.send(event).await {
                warn!(error = %e, "Failed to publish lifecycle event");
            }
        }
        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: target.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, "Failed to publish status change event");
        }

        Ok(order)
    }

    /// Marks pre-existing reviews by this customer for the purchased
    /// products as verified. Reconciliation only; failures are logged.
    async fn mark_reviews_verified(&self, order: &order::Model, items: &[order_item::Model]) {
        for item in items {
            let Some(product_id) = item.product_id else {
                continue;
            };

            let result = ProductReviewEntity::update_many()
                .col_expr(product_review::Column::VerifiedPurchase, Expr::value(true))
                .filter(product_review::Column::ProductId.eq(product_id))
                .filter(product_review::Column::CustomerEmail.eq(order.customer_email.clone()))
                .exec(&*self.db)
                .await;

            match result {
                Ok(update) if update.rows_affected > 0 => {
                    info!(
                        "Marked {} review(s) for product {} as verified purchase",
                        update.rows_affected, product_id
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "Failed to mark reviews verified for product {}: {}",
                        product_id, e
                    );
                }
            }
        }
    }

    /// Admin notification address via tenant ownership, with a hardcoded
    /// fallback when the tenant is missing or the lookup fails.
    async fn resolve_admin_email(&self, tenant_id: Option<Uuid>) -> String {
        let Some(tenant_id) = tenant_id else {
            return ADMIN_FALLBACK_EMAIL.to_string();
        };

        match TenantEntity::find_by_id(tenant_id).one(&*self.db).await {
            Ok(Some(tenant)) => tenant.owner_email,
            Ok(None) => {
                warn!("Tenant {} not found, using fallback admin email", tenant_id);
                ADMIN_FALLBACK_EMAIL.to_string()
            }
            Err(e) => {
                error!("Tenant lookup failed for {}: {}", tenant_id, e);
                ADMIN_FALLBACK_EMAIL.to_string()
            }
        }
    }
}
