//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `EMPORIUM_BASE_URL` - Public URL for the storefront API
//! - `EMPORIUM_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `EMPORIUM_ENCRYPTION_KEY` - Base64 encoded 32-byte key for address/payment sealing
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//!
//! ## Optional
//! - `EMPORIUM_HOST` - Bind address (default: 127.0.0.1)
//! - `EMPORIUM_PORT` - Listen port (default: 3000)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com/v1>)
//! - `EMPORIUM_CURRENCY` - ISO currency code for prices (default: USD)
//! - `EMPORIUM_TAX_RATE` - Tax rate as a fraction, e.g. `0.0825` (default: 0)
//! - `EMPORIUM_FLAT_SHIPPING` - Flat shipping fee (default: 5.00)
//! - `EMPORIUM_FREE_SHIPPING_THRESHOLD` - Subtotal for free shipping (default: 50.00)
//! - `EMPORIUM_STORE_NAME` - Store name printed on invoices (default: Emporium)
//! - `EMPORIUM_STORE_ADDRESS` - Store address printed on invoices, `|` separated lines
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use emporium_core::CurrencyCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretBox, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Length in bytes of the AES-256 sealing key.
pub const ENCRYPTION_KEY_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Raw AES-256 key material.
pub type EncryptionKey = SecretBox<[u8; ENCRYPTION_KEY_LENGTH]>;

/// Server application configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Key used to seal addresses and payment details
    pub encryption_key: EncryptionKey,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Pricing rules applied at checkout
    pub commerce: CommerceConfig,
    /// Store identity printed on invoices
    pub store: StoreConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (server-side only)
    pub secret_key: SecretString,
    /// API base URL, overridable for tests and stripe-mock
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Checkout pricing rules.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Currency of every price in the catalog
    pub currency: CurrencyCode,
    /// Tax rate as a fraction of the subtotal
    pub tax_rate: Decimal,
    /// Shipping fee charged below the free shipping threshold
    pub flat_shipping: Decimal,
    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Decimal,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::USD,
            tax_rate: Decimal::ZERO,
            flat_shipping: Decimal::new(500, 2),
            free_shipping_threshold: Decimal::new(5000, 2),
        }
    }
}

/// Store identity shown on invoices.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Trading name
    pub name: String,
    /// Postal address lines
    pub address_lines: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "Emporium".to_string(),
            address_lines: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("EMPORIUM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("EMPORIUM_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("EMPORIUM_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EMPORIUM_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("EMPORIUM_BASE_URL")?;
        validate_url(&base_url, "EMPORIUM_BASE_URL")?;
        let session_secret = get_validated_secret("EMPORIUM_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "EMPORIUM_SESSION_SECRET")?;
        let encryption_key = decode_encryption_key(
            &get_required_env("EMPORIUM_ENCRYPTION_KEY")?,
            "EMPORIUM_ENCRYPTION_KEY",
        )?;

        let stripe = StripeConfig::from_env()?;
        let commerce = CommerceConfig::from_env()?;
        let store = StoreConfig::from_env();

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            encryption_key,
            stripe,
            commerce,
            store,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_base = get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com/v1");
        validate_url(&api_base, "STRIPE_API_BASE")?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

impl CommerceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let currency = match get_optional_env("EMPORIUM_CURRENCY") {
            Some(code) => code
                .parse::<CurrencyCode>()
                .map_err(|e| ConfigError::InvalidEnvVar("EMPORIUM_CURRENCY".to_string(), e))?,
            None => defaults.currency,
        };
        let tax_rate = get_decimal_env("EMPORIUM_TAX_RATE", defaults.tax_rate)?;
        if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "EMPORIUM_TAX_RATE".to_string(),
                "must be a fraction in [0, 1)".to_string(),
            ));
        }
        let flat_shipping = get_decimal_env("EMPORIUM_FLAT_SHIPPING", defaults.flat_shipping)?;
        let free_shipping_threshold = get_decimal_env(
            "EMPORIUM_FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
        )?;
        if flat_shipping < Decimal::ZERO || free_shipping_threshold < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "EMPORIUM_FLAT_SHIPPING".to_string(),
                "shipping amounts cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            currency,
            tax_rate,
            flat_shipping,
            free_shipping_threshold,
        })
    }
}

impl StoreConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_optional_env("EMPORIUM_STORE_NAME").unwrap_or(defaults.name),
            address_lines: get_optional_env("EMPORIUM_STORE_ADDRESS")
                .map(|raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a decimal environment variable with a default value.
fn get_decimal_env(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<Decimal>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Validate that a value is an absolute http(s) URL.
fn validate_url(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must use http or https".to_string(),
        ));
    }
    Ok(())
}

/// Decode and validate the base64 sealing key.
fn decode_encryption_key(encoded: &str, var_name: &str) -> Result<EncryptionKey, ConfigError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    let key: [u8; ENCRYPTION_KEY_LENGTH] = bytes.try_into().map_err(|bytes: Vec<u8>| {
        ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must decode to exactly {ENCRYPTION_KEY_LENGTH} bytes (got {})",
                bytes.len()
            ),
        )
    })?;
    let first = key.first().copied();
    if key.iter().all(|&b| Some(b) == first) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "key bytes are all identical".to_string(),
        ));
    }
    Ok(SecretBox::new(Box::new(key)))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_key() -> String {
        BASE64.encode((0_u8..32).collect::<Vec<_>>())
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_decode_encryption_key_valid() {
        let key = decode_encryption_key(&test_key(), "TEST_KEY").unwrap();
        assert_eq!(key.expose_secret()[31], 31);
    }

    #[test]
    fn test_decode_encryption_key_wrong_length() {
        let short = BASE64.encode([1_u8, 2, 3]);
        let result = decode_encryption_key(&short, "TEST_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_decode_encryption_key_rejects_constant_bytes() {
        let zeros = BASE64.encode([0_u8; 32]);
        assert!(decode_encryption_key(&zeros, "TEST_KEY").is_err());
    }

    #[test]
    fn test_decode_encryption_key_not_base64() {
        let result = decode_encryption_key("not base64!!", "TEST_KEY");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://shop.test", "URL").is_ok());
        assert!(validate_url("ftp://shop.test", "URL").is_err());
        assert!(validate_url("shop.test", "URL").is_err());
    }

    #[test]
    fn test_stripe_config_debug_redacts_secret() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_super_sensitive"),
            api_base: "https://api.stripe.com/v1".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_live_super_sensitive"));
    }

    #[test]
    fn test_commerce_defaults() {
        let commerce = CommerceConfig::default();
        assert_eq!(commerce.currency, CurrencyCode::USD);
        assert_eq!(commerce.flat_shipping, Decimal::new(5, 0));
        assert_eq!(commerce.free_shipping_threshold, Decimal::new(50, 0));
    }
}
