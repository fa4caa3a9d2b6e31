use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Festa Fácil API",
        version = "1.0.0",
        description = r#"
# Festa Fácil Commerce API

Storefront and back-office API for party-decoration businesses: checkout with
hosted payment links, payment and carrier webhooks, shipping estimation,
order tracking and electronic contract signature.

## Webhooks

Payment providers (Asaas, Stripe) and the carrier (Melhor Envio) deliver
events at-least-once. Webhook endpoints answer `200` for everything they
understood, including events that changed nothing, so providers stop
retrying.

## Localization

Customer-facing validation messages are in Brazilian Portuguese; amounts are
BRL decimals and CEPs are 8-digit postal codes.
        "#,
        contact(
            name = "Festa Fácil",
            email = "pedidos@festafacil.com.br",
            url = "https://festafacil.com.br"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "https://api.festafacil.com.br", description = "Production server"),
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Cart to hosted payment link"),
        (name = "Shipping", description = "Shipping rate estimation"),
        (name = "Tracking", description = "Order tracking lookups"),
        (name = "Webhooks", description = "Payment and carrier callbacks"),
        (name = "Contracts", description = "Electronic contract signature"),
        (name = "Coupons", description = "Discount code validation"),
        (name = "Orders", description = "Back-office order access"),
    ),
    paths(
        crate::handlers::checkout::create_checkout,
        crate::handlers::shipping::calculate_shipping,
        crate::handlers::tracking::track_order,
        crate::handlers::payment_webhooks::asaas_webhook,
        crate::handlers::payment_webhooks::stripe_webhook,
        crate::handlers::shipping_webhooks::melhor_envio_webhook,
        crate::handlers::contracts::create_contract,
        crate::handlers::contracts::get_contract,
        crate::handlers::contracts::sign_contract,
        crate::handlers::coupons::validate_coupon,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            // Checkout types
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CartItemInput,
            crate::services::checkout::CustomerInput,
            crate::services::checkout::ShippingAddressInput,
            crate::services::checkout::CheckoutResponse,

            // Shipping types
            crate::handlers::shipping::CalculateShippingRequest,
            crate::services::shipping_quote::ShippingOption,
            crate::services::shipping_quote::DeliveryRange,

            // Tracking types
            crate::handlers::tracking::TrackOrderRequest,
            crate::services::tracking::TrackingReport,
            crate::gateways::melhor_envio::CarrierTrackingEvent,
            crate::handlers::shipping_webhooks::CarrierWebhookRequest,

            // Contract types
            crate::services::contracts::CreateContractRequest,
            crate::services::contracts::SignContractRequest,
            crate::handlers::contracts::ContractView,

            // Coupon types
            crate::handlers::coupons::ValidateCouponRequest,
            crate::services::coupons::CouponValidation,

            // Order types
            crate::handlers::orders::OrderView,
            crate::handlers::orders::OrderItemView,
            crate::handlers::orders::TrackingEventView,
            crate::handlers::orders::OrderDetailResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
