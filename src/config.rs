use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    auth::AdminPolicy, gateway::razorpay::RAZORPAY_API_BASE, services::selection::FuturePaymentPolicy,
};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_DEMO_DELAY_MS: u64 = 1500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SITE_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_EMAIL_FROM: &str = "Consulting <hello@example.com>";
const CONFIG_DIR: &str = "config";

/// Values that ship in sample env files and must never be treated as real keys.
const PLACEHOLDER_MARKERS: &[&str] = &["placeholder", "your_", "rzp_test_xxxx", "changeme"];

/// Gateway key pair. The secret is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

/// Resolved once at load time from the gateway keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentMode {
    Live(GatewayCredentials),
    #[default]
    Demo,
}

impl PaymentMode {
    pub fn resolve(key_id: Option<&str>, key_secret: Option<&str>) -> Self {
        match (usable_key(key_id), usable_key(key_secret)) {
            (Some(key_id), Some(key_secret)) => PaymentMode::Live(GatewayCredentials {
                key_id: key_id.to_string(),
                key_secret: key_secret.to_string(),
            }),
            _ => PaymentMode::Demo,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, PaymentMode::Demo)
    }
}

fn usable_key(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let lowered = value.to_ascii_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return None;
    }
    Some(value)
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Public site origin, used to build auth redirect links
    #[validate(custom = "validate_http_url")]
    pub site_base_url: String,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_currency")]
    #[validate(custom = "crate::services::validate_currency")]
    pub currency: String,

    #[serde(default)]
    pub future_payment_policy: FuturePaymentPolicy,

    /// Simulated processing time for demo payments
    #[serde(default = "default_demo_delay_ms")]
    #[validate(range(max = 60000))]
    pub demo_payment_delay_ms: u64,

    /// Request timeout for every collaborator client
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub razorpay_key_id: Option<String>,
    #[serde(default)]
    pub razorpay_key_secret: Option<String>,
    #[serde(default = "default_razorpay_api_base")]
    pub razorpay_api_base: String,

    /// Hosted database/auth project URL; in-memory storage when unset
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub supabase_service_role_key: Option<String>,

    /// Email provider key; emails are only logged when unset
    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    /// Inbox that receives new-lead alerts
    #[serde(default)]
    pub notification_email: Option<String>,

    /// Comma-separated admin allowlist
    #[serde(default)]
    pub admin_emails: String,

    #[serde(skip)]
    pub payment_mode: PaymentMode,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            cors_allowed_origins: None,
            currency: default_currency(),
            future_payment_policy: FuturePaymentPolicy::default(),
            demo_payment_delay_ms: default_demo_delay_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_base: default_razorpay_api_base(),
            supabase_url: None,
            supabase_anon_key: None,
            supabase_service_role_key: None,
            resend_api_key: None,
            email_from: default_email_from(),
            notification_email: None,
            admin_emails: String::new(),
            payment_mode: PaymentMode::Demo,
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        AdminPolicy::from_allowlist(&self.admin_emails)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn demo_payment_delay(&self) -> Duration {
        Duration::from_millis(self.demo_payment_delay_ms)
    }

    /// Where new-lead alerts go; falls back to the sender address.
    pub fn notification_recipient(&self) -> &str {
        self.notification_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.email_from)
    }

    pub fn resend_key(&self) -> Option<&str> {
        usable_key(self.resend_api_key.as_deref())
    }

    /// Set when a hosted record store and auth service are configured.
    pub fn supabase(&self) -> Option<SupabaseSettings<'_>> {
        let url = self.supabase_url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some(SupabaseSettings {
            url,
            anon_key: self.supabase_anon_key.as_deref().unwrap_or_default(),
            service_role_key: self.supabase_service_role_key.as_deref().unwrap_or_default(),
        })
    }

    pub fn resolve_payment_mode(&mut self) {
        self.payment_mode = PaymentMode::resolve(
            self.razorpay_key_id.as_deref(),
            self.razorpay_key_secret.as_deref(),
        );
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.cors_origins().is_empty() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message =
                Some("Set APP__CORS_ALLOWED_ORIGINS for non-development environments".into());
            errors.add("cors_allowed_origins", err);
        }

        if let Some(supabase) = self.supabase() {
            if url::Url::parse(supabase.url).is_err() {
                let mut err = ValidationError::new("url");
                err.message = Some("supabase_url must be an absolute URL".into());
                errors.add("supabase_url", err);
            }
            if supabase.service_role_key.trim().is_empty() || supabase.anon_key.trim().is_empty() {
                let mut err = ValidationError::new("supabase_keys_required");
                err.message = Some(
                    "APP__SUPABASE_ANON_KEY and APP__SUPABASE_SERVICE_ROLE_KEY are required with APP__SUPABASE_URL"
                        .into(),
                );
                errors.add("supabase_service_role_key", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupabaseSettings<'a> {
    pub url: &'a str,
    pub anon_key: &'a str,
    pub service_role_key: &'a str,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_demo_delay_ms() -> u64 {
    DEFAULT_DEMO_DELAY_MS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_razorpay_api_base() -> String {
    RAZORPAY_API_BASE.to_string()
}

fn default_email_from() -> String {
    DEFAULT_EMAIL_FROM.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("site_base_url", DEFAULT_SITE_BASE_URL)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.resolve_payment_mode();
    if app_config.payment_mode.is_demo() {
        warn!("Payment gateway keys missing or placeholder; checkout runs in demo mode");
    }
    if app_config.admin_policy().is_empty() {
        warn!("APP__ADMIN_EMAILS is empty; admin endpoints will reject everyone");
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new("127.0.0.1".into(), 8080, "production".into())
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        assert!(base_config().validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://example.com, https://www.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_eq!(cfg.cors_origins().len(), 2);
    }

    #[test]
    fn supabase_url_requires_keys() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.supabase_url = Some("https://abc.supabase.co".into());
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.supabase_anon_key = Some("anon".into());
        cfg.supabase_service_role_key = Some("service".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn notification_recipient_falls_back_to_sender() {
        let mut cfg = base_config();
        assert_eq!(cfg.notification_recipient(), DEFAULT_EMAIL_FROM);
        cfg.notification_email = Some("leads@firm.example".into());
        assert_eq!(cfg.notification_recipient(), "leads@firm.example");
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut cfg = base_config();
        cfg.log_level = "loud".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }
}
