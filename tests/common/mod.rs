//! Shared harness for integration tests: an app backed by a throwaway SQLite
//! file, an in-process event loop and a mailer that records instead of sends.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use festa_api::{
    config::AppConfig,
    db,
    entities::{coupon, order, order_item, tenant},
    events::{self, EventSender},
    handlers::{AppServices, GatewayClients},
    notifications::{EmailMessage, Mailer, NotificationError},
    AppState,
};

/// Mailer double that records every message so tests can assert on sends.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        self.sent.lock().expect("mailer lock").push(message);
        Ok(())
    }
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

/// Helper harness for spinning up an application backed by a temp SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _db_file: tempfile::NamedTempFile,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a test application with no outbound providers configured.
    pub async fn new() -> Self {
        Self::with_parts(GatewayClients::default(), |_| {}).await
    }

    /// Construct a test application talking to the given gateway clients,
    /// typically pointed at wiremock servers.
    pub async fn with_gateways(gateways: GatewayClients) -> Self {
        Self::with_parts(gateways, |_| {}).await
    }

    /// Full-control constructor: gateway clients plus a config hook for
    /// webhook secrets and similar knobs.
    pub async fn with_parts(
        gateways: GatewayClients,
        configure: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("temp db file");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.path().display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        configure(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let mailer = Arc::new(RecordingMailer::default());
        let mailer_dyn: Arc<dyn Mailer> = mailer.clone();

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            gateways,
            mailer_dyn,
            cfg.checkout_success_url.clone(),
            cfg.checkout_cancel_url.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = festa_api::base_router(state.clone());

        Self {
            router,
            state,
            mailer,
            _db_file: db_file,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with an exact byte body and extra headers. Webhook
    /// signature checks run over the raw payload, so no re-serialization here.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: String,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(body))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Insert an order row directly, bypassing checkout.
    pub async fn seed_order(&self, status: &str, total: Decimal) -> order::Model {
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(None),
            customer_name: Set("Ana Souza".to_string()),
            customer_email: Set("cliente@example.com".to_string()),
            customer_phone: Set(None),
            status: Set(status.to_string()),
            total_amount: Set(total),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed order")
    }

    /// Insert an order already handed to a carrier.
    pub async fn seed_shipped_order(&self, tracking_code: &str) -> order::Model {
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(None),
            customer_name: Set("Ana Souza".to_string()),
            customer_email: Set("cliente@example.com".to_string()),
            customer_phone: Set(None),
            status: Set("shipped".to_string()),
            total_amount: Set(Decimal::new(9980, 2)),
            tracking_code: Set(Some(tracking_code.to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed shipped order")
    }

    /// Insert an item under an order.
    pub async fn seed_order_item(
        &self,
        order_id: Uuid,
        name: &str,
        quantity: i32,
        unit_price: Decimal,
        is_digital: bool,
    ) -> order_item::Model {
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(Some(Uuid::new_v4())),
            product_name: Set(name.to_string()),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            total_price: Set(unit_price * Decimal::from(quantity)),
            is_digital: Set(is_digital),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed order item")
    }

    /// Insert an active 10% coupon under the given code.
    pub async fn seed_coupon(&self, code: &str) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(None),
            code: Set(code.to_string()),
            discount_type: Set("percentage".to_string()),
            discount_value: Set(Decimal::new(10, 0)),
            min_order_amount: Set(None),
            max_uses: Set(None),
            used_count: Set(0),
            starts_at: Set(None),
            expires_at: Set(None),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon")
    }

    /// Insert a tenant whose owner receives admin notifications.
    pub async fn seed_tenant(&self, owner_email: &str) -> tenant::Model {
        tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_name: Set("Festas da Ana".to_string()),
            owner_email: Set(owner_email.to_string()),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed tenant")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Decode a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
