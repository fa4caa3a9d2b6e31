pub mod contract;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod product_review;
pub mod tenant;
pub mod tracking_event;

pub use order::OrderStatus;
