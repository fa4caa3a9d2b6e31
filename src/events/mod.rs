use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle
    OrderCreated(Uuid),
    OrderPaid(Uuid),
    OrderCanceled(Uuid),
    OrderShipped(Uuid),
    OrderDelivered(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Shipping pipeline
    TrackingEventRecorded {
        order_id: Uuid,
        status: String,
        event_date: DateTime<Utc>,
    },

    // Coupons
    CouponRedeemed {
        coupon_id: Uuid,
        order_id: Uuid,
        code: String,
    },

    // Contracts
    ContractSigned(Uuid),
}

// Function to process incoming events and log/dispatch them. Delivery is
// best-effort: a failed handler never fails the request that emitted it.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::OrderCreated(order_id) => {
                if let Err(e) = handle_order_created(order_id).await {
                    error!(
                        "Failed to handle order created event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderPaid(order_id) => {
                info!("Order {} confirmed as paid", order_id);
            }
            Event::OrderCanceled(order_id) => {
                warn!("Order {} canceled", order_id);
            }
            Event::OrderShipped(order_id) => {
                info!("Order {} handed to carrier", order_id);
            }
            Event::OrderDelivered(order_id) => {
                info!("Order {} delivered", order_id);
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    "Order {} status changed: {} -> {}",
                    order_id, old_status, new_status
                );
            }
            Event::TrackingEventRecorded {
                order_id,
                status,
                event_date,
            } => {
                info!(
                    "Tracking event recorded for order {}: {} at {}",
                    order_id, status, event_date
                );
            }
            Event::CouponRedeemed {
                coupon_id,
                order_id,
                code,
            } => {
                info!(
                    "Coupon {} ({}) redeemed on order {}",
                    code, coupon_id, order_id
                );
            }
            Event::ContractSigned(contract_id) => {
                info!("Contract {} signed", contract_id);
            }
        }
    }

    info!("Event processing loop ended");
}

async fn handle_order_created(order_id: Uuid) -> Result<(), String> {
    info!("Processing order created event for order {}", order_id);

    // Downstream side effects (email, payment link) happen in the checkout
    // path itself; the event stream is for observers.
    Ok(())
}
