use std::{net::SocketAddr, sync::Arc};

use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{error, info};

use festa_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Outbound HTTP clients for the configured providers
    let http_client = api::gateways::build_http_client(cfg.http_timeout_secs)?;

    let asaas = cfg.asaas_api_key.clone().map(|key| {
        info!("Asaas payment links enabled");
        api::gateways::asaas::AsaasClient::new(http_client.clone(), cfg.asaas_api_url.clone(), key)
    });
    let stripe = cfg.stripe_secret_key.clone().map(|key| {
        info!("Stripe hosted checkout enabled");
        api::gateways::stripe::StripeClient::new(
            http_client.clone(),
            cfg.stripe_api_url.clone(),
            key,
        )
    });
    let melhor_envio = cfg.melhor_envio_token.clone().map(|token| {
        info!("Melhor Envio tracking lookups enabled");
        api::gateways::melhor_envio::MelhorEnvioClient::new(
            http_client.clone(),
            cfg.melhor_envio_api_url.clone(),
            token,
        )
    });
    if asaas.is_none() && stripe.is_none() {
        info!("No payment provider configured; checkout requests will be rejected");
    }

    let mailer: Arc<dyn api::notifications::Mailer> = match cfg.resend_api_key.clone() {
        Some(key) => {
            info!("Transactional email enabled via Resend");
            Arc::new(api::notifications::ResendMailer::new(
                http_client.clone(),
                cfg.resend_api_url.clone(),
                key,
                cfg.mail_from.clone(),
            ))
        }
        None => {
            info!("APP__RESEND_API_KEY not set; outbound email disabled");
            Arc::new(api::notifications::NoopMailer)
        }
    };

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        Arc::new(event_sender.clone()),
        api::handlers::GatewayClients {
            asaas,
            stripe,
            melhor_envio,
        },
        mailer,
        cfg.checkout_success_url.clone(),
        cfg.checkout_cancel_url.clone(),
    );

    // Compose shared app state
    let app_state = api::AppState {
        db: db_arc.clone(),
        config: cfg.clone(),
        event_sender,
        services,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        anyhow::bail!(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
        );
    };

    // Build router: status/health + full v1 API + Swagger UI
    let app = api::base_router(app_state)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(api::request_id::http_trace_layer())
        // Apply compression
        .layer(CompressionLayer::new())
        // Apply CORS
        .layer(cors_layer)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            api::request_id::request_id_middleware,
        ));

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("🎉 festa-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
