use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(custom = "validate_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default = "default_false_bool")]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB pool: connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// DB pool: idle timeout (seconds)
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// DB pool: acquire timeout (seconds)
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// DB: statement timeout (seconds), unset disables
    #[serde(default)]
    pub db_statement_timeout_secs: Option<u64>,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Timeout applied to outbound provider HTTP calls (seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Asaas payment API key; checkout requires it
    #[serde(default)]
    pub asaas_api_key: Option<String>,

    /// Asaas API base URL (overridable for sandbox/testing)
    #[serde(default = "default_asaas_api_url")]
    pub asaas_api_url: String,

    /// Expected value of the asaas-access-token webhook header; unset skips the check
    #[serde(default)]
    pub asaas_webhook_token: Option<String>,

    /// Stripe secret key, enables hosted checkout sessions
    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    /// Stripe API base URL
    #[serde(default = "default_stripe_api_url")]
    pub stripe_api_url: String,

    /// Stripe webhook signing secret; unset skips signature verification
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    /// Tolerance for the Stripe signature timestamp (seconds)
    #[serde(default)]
    pub stripe_webhook_tolerance_secs: Option<u64>,

    /// Melhor Envio API token; unset disables live tracking lookups
    #[serde(default)]
    pub melhor_envio_token: Option<String>,

    /// Melhor Envio API base URL
    #[serde(default = "default_melhor_envio_api_url")]
    pub melhor_envio_api_url: String,

    /// Resend API key; unset disables outbound email
    #[serde(default)]
    pub resend_api_key: Option<String>,

    /// Resend API base URL
    #[serde(default = "default_resend_api_url")]
    pub resend_api_url: String,

    /// From address used for transactional email
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// URL customers land on after a successful hosted checkout
    #[serde(default = "default_checkout_success_url")]
    pub checkout_success_url: String,

    /// URL customers land on after abandoning a hosted checkout
    #[serde(default = "default_checkout_cancel_url")]
    pub checkout_cancel_url: String,
}

fn validate_environment(value: &str) -> Result<(), ValidationError> {
    match value {
        "development" | "test" | "staging" | "production" => Ok(()),
        _ => {
            let mut err = ValidationError::new("environment_unknown");
            err.message =
                Some("environment must be one of development, test, staging, production".into());
            Err(err)
        }
    }
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for everything optional
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_statement_timeout_secs: None,
            event_channel_capacity: default_event_channel_capacity(),
            http_timeout_secs: default_http_timeout_secs(),
            asaas_api_key: None,
            asaas_api_url: default_asaas_api_url(),
            asaas_webhook_token: None,
            stripe_secret_key: None,
            stripe_api_url: default_stripe_api_url(),
            stripe_webhook_secret: None,
            stripe_webhook_tolerance_secs: None,
            melhor_envio_token: None,
            melhor_envio_api_url: default_melhor_envio_api_url(),
            resend_api_key: None,
            resend_api_url: default_resend_api_url(),
            mail_from: default_mail_from(),
            checkout_success_url: default_checkout_success_url(),
            checkout_cancel_url: default_checkout_cancel_url(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.environment.eq_ignore_ascii_case("test") || self.cors_allow_any_origin
    }

    /// Gets the configured log level
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Gets statement timeout as Duration
    pub fn db_statement_timeout(&self) -> Option<std::time::Duration> {
        self.db_statement_timeout_secs
            .map(std::time::Duration::from_secs)
    }

    /// Constraints that are about combinations of fields rather than single values
    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.is_production() && self.asaas_api_key.is_none() && self.stripe_secret_key.is_none()
        {
            let mut err = ValidationError::new("payment_provider_required");
            err.message = Some(
                "Production requires a payment provider: set APP__ASAAS_API_KEY or APP__STRIPE_SECRET_KEY".into(),
            );
            errors.add("asaas_api_key", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_false_bool() -> bool {
    false
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_asaas_api_url() -> String {
    "https://api.asaas.com/v3".to_string()
}

fn default_stripe_api_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_melhor_envio_api_url() -> String {
    "https://melhorenvio.com.br/api/v2".to_string()
}

fn default_resend_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_mail_from() -> String {
    "Festa Fácil <pedidos@festafacil.com.br>".to_string()
}

fn default_checkout_success_url() -> String {
    "https://festafacil.com.br/pedido/sucesso".to_string()
}

fn default_checkout_cancel_url() -> String {
    "https://festafacil.com.br/pedido/cancelado".to_string()
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level is applied to this
/// crate and tower_http.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("festa_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !std::path::Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://festa.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(environment: &str) -> AppConfig {
        AppConfig::new(
            "sqlite://festa_test.db?mode=rwc".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            environment.to_string(),
        )
    }

    #[test]
    fn development_passes_without_cors_origins() {
        let cfg = base_config("development");
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_cors_origins_or_override() {
        let mut cfg = base_config("production");
        cfg.asaas_api_key = Some("key".to_string());
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.cors_allowed_origins = Some("https://festafacil.com.br".to_string());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_a_payment_provider() {
        let mut cfg = base_config("production");
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.stripe_secret_key = Some("sk_live_x".to_string());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let cfg = base_config("sandbox");
        assert!(cfg.validate().is_err());
    }
}
