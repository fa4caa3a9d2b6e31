use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{order, order_item, tracking_event};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub status: String,
    pub total_amount: Decimal,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip: Option<String>,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub tracking_code: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&order::Model> for OrderView {
    fn from(model: &order::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            customer_name: model.customer_name.clone(),
            customer_email: model.customer_email.clone(),
            customer_phone: model.customer_phone.clone(),
            status: model.status.clone(),
            total_amount: model.total_amount,
            shipping_city: model.shipping_city.clone(),
            shipping_state: model.shipping_state.clone(),
            shipping_zip: model.shipping_zip.clone(),
            payment_id: model.payment_id.clone(),
            coupon_code: model.coupon_code.clone(),
            tracking_code: model.tracking_code.clone(),
            delivered_at: model.delivered_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub is_digital: bool,
    pub customization_status: Option<String>,
    pub customization_deadline: Option<DateTime<Utc>>,
}

impl From<&order_item::Model> for OrderItemView {
    fn from(model: &order_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name.clone(),
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
            is_digital: model.is_digital,
            customization_status: model.customization_status.clone(),
            customization_deadline: model.customization_deadline,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingEventView {
    pub status: String,
    pub description: String,
    pub location: Option<String>,
    pub event_date: DateTime<Utc>,
}

impl From<&tracking_event::Model> for TrackingEventView {
    fn from(model: &tracking_event::Model) -> Self {
        Self {
            status: model.status.clone(),
            description: model.description.clone(),
            location: model.location.clone(),
            event_date: model.event_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
    pub events: Vec<TrackingEventView>,
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated order list, newest first",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderView>>),
        (status = 500, description = "Database failure", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderView>>>, ServiceError> {
    let result = state
        .services
        .orders
        .list_orders(query.page, query.limit)
        .await?;

    let total_pages = (result.total + result.per_page - 1) / result.per_page;
    let items: Vec<OrderView> = result.orders.iter().map(OrderView::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Order with its line items and tracking history",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetailResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let details = state
        .services
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

    Ok(Json(ApiResponse::success(OrderDetailResponse {
        order: OrderView::from(&details.order),
        items: details.items.iter().map(OrderItemView::from).collect(),
        events: details.events.iter().map(TrackingEventView::from).collect(),
    })))
}
