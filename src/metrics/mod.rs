//! Prometheus registry for the business counters scattered across the
//! service modules, plus the text-format renderer behind `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(crate::services::checkout::CHECKOUTS_COMPLETED.clone()),
            Box::new(crate::services::checkout::CHECKOUT_FAILURES.clone()),
            Box::new(crate::services::orders::PAYMENT_EVENTS_APPLIED.clone()),
            Box::new(crate::services::orders::PAYMENT_EVENTS_IGNORED.clone()),
            Box::new(crate::services::orders::CARRIER_EVENTS_RECORDED.clone()),
            Box::new(crate::services::tracking::TRACKING_LOOKUPS.clone()),
            Box::new(crate::services::tracking::TRACKING_LOOKUP_FAILURES.clone()),
            Box::new(crate::notifications::EMAILS_SENT.clone()),
            Box::new(crate::notifications::EMAIL_FAILURES.clone()),
        ];

        for collector in collectors {
            registry
                .register(collector)
                .expect("collector can be registered");
        }

        registry
    };
}

/// Renders every registered collector in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
