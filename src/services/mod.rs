// Core services
pub mod checkout;
pub mod orders;
pub mod tracking;

// Stateless shipping estimation
pub mod shipping_quote;

// Ancillary storefront services
pub mod contracts;
pub mod coupons;
