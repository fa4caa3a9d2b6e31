pub mod checkout;
pub mod contracts;
pub mod coupons;
pub mod orders;
pub mod payment_webhooks;
pub mod shipping;
pub mod shipping_webhooks;
pub mod tracking;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateways::{AsaasClient, MelhorEnvioClient, StripeClient};
use crate::notifications::Mailer;
use crate::services::checkout::CheckoutService;
use crate::services::contracts::ContractService;
use crate::services::coupons::CouponService;
use crate::services::orders::OrderService;
use crate::services::tracking::TrackingService;

/// Provider clients assembled at startup. Absent entries degrade the
/// matching feature instead of failing the whole server.
#[derive(Default)]
pub struct GatewayClients {
    pub asaas: Option<AsaasClient>,
    pub stripe: Option<StripeClient>,
    pub melhor_envio: Option<MelhorEnvioClient>,
}

/// Service container shared across handlers through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub tracking: Arc<TrackingService>,
    pub contracts: Arc<ContractService>,
    pub coupons: Arc<CouponService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateways: GatewayClients,
        mailer: Arc<dyn Mailer>,
        checkout_success_url: String,
        checkout_cancel_url: String,
    ) -> Self {
        let orders = Arc::new(OrderService::new(db_pool.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            gateways.asaas,
            gateways.stripe,
            checkout_success_url,
            checkout_cancel_url,
        ));
        let tracking = Arc::new(TrackingService::new(orders.clone(), gateways.melhor_envio));
        let contracts = Arc::new(ContractService::new(db_pool.clone(), event_sender));
        let coupons = Arc::new(CouponService::new(db_pool));

        Self {
            checkout,
            orders,
            tracking,
            contracts,
            coupons,
            mailer,
        }
    }
}
