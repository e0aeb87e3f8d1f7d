//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. All variables are prefixed `BIASHARA_` except the gateway
//! credentials which keep the provider's conventional `MPESA_` names.

use serde::{Deserialize, Serialize};
use std::env;

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Maximum database pool connections
    pub db_max_connections: u32,

    /// M-Pesa gateway settings
    pub mpesa: MpesaConfig,
}

/// M-Pesa STK Push gateway configuration.
///
/// Defaults target the Daraja sandbox. Production deployments set every
/// variable explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaConfig {
    /// OAuth consumer key
    pub consumer_key: String,

    /// OAuth consumer secret
    pub consumer_secret: String,

    /// Business short code (paybill). Sandbox default: 174379
    pub short_code: String,

    /// Lipa Na M-Pesa passkey
    pub passkey: String,

    /// Publicly reachable callback URL the provider posts results to
    pub callback_url: String,

    /// API base URL. Sandbox default: https://sandbox.safaricom.co.ke
    pub base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("BIASHARA_HTTP_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BIASHARA_HTTP_PORT".to_string()))?,

            database_path: env::var("BIASHARA_DATABASE_PATH")
                .unwrap_or_else(|_| "biashara.db".to_string()),

            db_max_connections: env::var("BIASHARA_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("BIASHARA_DB_MAX_CONNECTIONS".to_string())
                })?,

            mpesa: MpesaConfig::load()?,
        };

        Ok(config)
    }
}

impl MpesaConfig {
    /// Load gateway configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(MpesaConfig {
            consumer_key: env::var("MPESA_CONSUMER_KEY").unwrap_or_default(),

            consumer_secret: env::var("MPESA_CONSUMER_SECRET").unwrap_or_default(),

            short_code: env::var("MPESA_BUSINESS_SHORT_CODE")
                .unwrap_or_else(|_| "174379".to_string()),

            passkey: env::var("MPESA_PASSKEY").unwrap_or_default(),

            callback_url: env::var("MPESA_CALLBACK_URL")
                .unwrap_or_else(|_| "https://example.com/api/payments/callback".to_string()),

            base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_env() {
        let config = MpesaConfig::load().unwrap();
        assert_eq!(config.short_code, "174379");
        assert!(config.base_url.contains("sandbox"));
    }
}
