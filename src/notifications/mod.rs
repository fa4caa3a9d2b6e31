//! Transactional email: order confirmations, admin alerts, delivery and
//! contract notices, delivered through Resend.
//!
//! Every send is best-effort. Callers that must not fail on a broken mail
//! provider go through [`dispatch`], which logs and counts instead of
//! propagating.

use crate::entities::{contract, order, order_item};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Where admin alerts go when tenant resolution fails.
pub const ADMIN_FALLBACK_EMAIL: &str = "pedidos@festafacil.com.br";

lazy_static! {
    pub static ref EMAILS_SENT: IntCounter =
        IntCounter::new("emails_sent_total", "Total number of emails sent")
            .expect("metric can be created");
    pub static ref EMAIL_FAILURES: IntCounter = IntCounter::new(
        "email_failures_total",
        "Total number of failed email sends"
    )
    .expect("metric can be created");
}

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Email provider request failed: {0}")]
    Provider(String),
    #[error("Email provider rejected the message: {0}")]
    Rejected(String),
}

/// A fully rendered message ready for the provider.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Trait seam for email delivery, so tests can record instead of send.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Resend-backed mailer.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, from: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let request = ResendRequest {
            from: &self.from,
            to: vec![&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected(format!(
                "status {}: {}",
                status, body
            )));
        }

        info!("Email accepted by provider");
        Ok(())
    }
}

/// Mailer used when no provider key is configured: logs and drops.
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(
            "Email provider not configured; dropping email to {} ({})",
            message.to, message.subject
        );
        Ok(())
    }
}

/// Sends without propagating failure. State changes upstream of a
/// notification are the source of truth; a broken mail provider only logs.
pub async fn dispatch(mailer: &dyn Mailer, message: EmailMessage) {
    let to = message.to.clone();
    match mailer.send(message).await {
        Ok(()) => {
            EMAILS_SENT.inc();
        }
        Err(e) => {
            EMAIL_FAILURES.inc();
            warn!("Best-effort email to {} failed: {}", to, e);
        }
    }
}

fn format_brl(value: Decimal) -> String {
    format!("R$ {:.2}", value)
}

fn short_order_ref(order: &order::Model) -> String {
    let id = order.id.to_string();
    id[..8].to_uppercase()
}

fn item_rows(items: &[order_item::Model]) -> String {
    items
        .iter()
        .map(|item| {
            let kind = if item.is_digital {
                " (digital)"
            } else {
                ""
            };
            format!(
                "<tr><td>{}{}</td><td>{}x</td><td>{}</td></tr>",
                item.product_name,
                kind,
                item.quantity,
                format_brl(item.total_price)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Customer-facing payment confirmation, itemized with digital items and
/// their customization deadlines called out.
pub fn order_confirmation_email(
    order: &order::Model,
    items: &[order_item::Model],
) -> EmailMessage {
    let reference = short_order_ref(order);

    let digital_note = items
        .iter()
        .find(|item| item.is_digital)
        .and_then(|item| item.customization_deadline)
        .map(|deadline| {
            format!(
                "<p>Seus itens digitais aguardam personalização. Envie os dados até <strong>{}</strong>.</p>",
                deadline.format("%d/%m/%Y")
            )
        })
        .unwrap_or_default();

    let html = format!(
        "<h1>Pagamento confirmado! 🎉</h1>\
         <p>Olá {}, recebemos o pagamento do pedido <strong>#{}</strong>.</p>\
         <table><tr><th>Item</th><th>Qtd</th><th>Total</th></tr>{}</table>\
         <p>Total: <strong>{}</strong></p>\
         {}",
        order.customer_name,
        reference,
        item_rows(items),
        format_brl(order.total_amount),
        digital_note
    );

    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Pedido #{} confirmado - Festa Fácil", reference),
        html,
    }
}

/// Admin alert for a paid order.
pub fn admin_order_email(
    admin_to: &str,
    order: &order::Model,
    items: &[order_item::Model],
) -> EmailMessage {
    let reference = short_order_ref(order);

    let html = format!(
        "<h1>Novo pedido pago</h1>\
         <p>Pedido <strong>#{}</strong> de {} ({}) no valor de {}.</p>\
         <table><tr><th>Item</th><th>Qtd</th><th>Total</th></tr>{}</table>",
        reference,
        order.customer_name,
        order.customer_email,
        format_brl(order.total_amount),
        item_rows(items)
    );

    EmailMessage {
        to: admin_to.to_string(),
        subject: format!("Novo pedido pago #{}", reference),
        html,
    }
}

/// Delivery notice sent when a carrier reports the terminal state.
pub fn delivery_email(order: &order::Model) -> EmailMessage {
    let reference = short_order_ref(order);

    let tracking_note = order
        .tracking_code
        .as_deref()
        .map(|code| format!("<p>Código de rastreio: {}</p>", code))
        .unwrap_or_default();

    let html = format!(
        "<h1>Pedido entregue! 📦</h1>\
         <p>Olá {}, seu pedido <strong>#{}</strong> foi entregue.</p>\
         {}\
         <p>Esperamos que sua festa seja incrível!</p>",
        order.customer_name, reference, tracking_note
    );

    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Pedido #{} entregue", reference),
        html,
    }
}

/// Confirmation sent to the signer once a contract is signed.
pub fn contract_signed_email(contract: &contract::Model) -> EmailMessage {
    let html = format!(
        "<h1>Contrato assinado</h1>\
         <p>Olá {}, recebemos sua assinatura e o contrato está confirmado.</p>\
         <p>Guarde este email como comprovante.</p>",
        contract.customer_name
    );

    EmailMessage {
        to: contract.customer_email.clone(),
        subject: "Contrato assinado - Festa Fácil".to_string(),
        html,
    }
}
