//! # Payment Gateway Adapter
//!
//! The M-Pesa STK Push ("Lipa Na M-Pesa") adapter and the trait that
//! decouples the sale workflow from it.
//!
//! ## STK Push Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      STK Push Payment Flow                              │
//! │                                                                         │
//! │  Sale committed (pending)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. GET  /oauth/v1/generate ──────► access token (Basic auth)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. POST /mpesa/stkpush/v1/processrequest                              │
//! │       │     Password = b64(shortcode + passkey + timestamp)            │
//! │       ▼                                                                 │
//! │  Provider pushes PIN prompt to the customer's phone                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Provider POSTs result to CallBackURL (seconds to minutes later)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Callback reconciliation matches CheckoutRequestID to the sale         │
//! │                                                                         │
//! │  No network call in this module ever runs inside an open              │
//! │  database transaction.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use biashara_core::phone::normalize_phone;
use biashara_core::Money;

use crate::config::MpesaConfig;

// =============================================================================
// Errors
// =============================================================================

/// Payment gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Token fetch failed.
    #[error("Gateway authentication failed: {0}")]
    Auth(String),

    /// HTTP transport failure or non-success status.
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// The provider accepted the request but rejected the push.
    #[error("Push rejected by provider (code {code}): {description}")]
    Rejected { code: String, description: String },

    /// Response body did not match the documented shape.
    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),

    /// The customer phone number could not be normalized.
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Trait
// =============================================================================

/// Push initiation request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct StkPushRequest {
    /// Customer phone in any accepted local format.
    pub phone: String,

    /// Amount to charge.
    pub amount: Money,

    /// Account reference shown on the customer's statement.
    pub account_reference: String,

    /// Free-text description of the charge.
    pub description: String,
}

/// Successful push initiation.
#[derive(Debug, Clone)]
pub struct StkPushResponse {
    /// Provider reference echoed back in the callback.
    pub checkout_ref: String,

    /// Provider-side merchant request reference.
    pub merchant_ref: Option<String>,
}

/// Opportunistic status poll result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StkQueryResponse {
    /// Provider result code. "0" means paid.
    pub result_code: Option<String>,

    /// Human-readable result description.
    pub result_desc: Option<String>,
}

/// Abstraction over the mobile-money provider.
///
/// The sale workflow only ever talks to this trait, so tests substitute a
/// scripted implementation and the provider never sees test traffic.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiates an STK push to the customer's phone.
    async fn initiate_push(&self, request: &StkPushRequest) -> GatewayResult<StkPushResponse>;

    /// Queries the status of a previously initiated push.
    async fn query_status(&self, checkout_ref: &str) -> GatewayResult<StkQueryResponse>;
}

// =============================================================================
// M-Pesa Implementation
// =============================================================================

/// M-Pesa Daraja STK Push gateway.
#[derive(Debug, Clone)]
pub struct MpesaGateway {
    config: MpesaConfig,
    http: reqwest::Client,
}

impl MpesaGateway {
    /// Creates a gateway from configuration.
    pub fn new(config: MpesaConfig) -> Self {
        MpesaGateway {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches a fresh OAuth access token.
    ///
    /// One token per operation, no caching.
    async fn access_token(&self) -> GatewayResult<String> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?
            .error_for_status()
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Auth("No access_token in response".to_string()))
    }

    /// Derives the request password and its timestamp.
    ///
    /// Password = base64(shortcode + passkey + timestamp), timestamp in
    /// `%Y%m%d%H%M%S`. Both must be sent together; the provider re-derives
    /// the password from the timestamp it is given.
    fn derive_password(&self) -> (String, String) {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let password = derive_password(&self.config.short_code, &self.config.passkey, &timestamp);
        (password, timestamp)
    }
}

/// Derives the STK request password for a given timestamp.
pub fn derive_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{short_code}{passkey}{timestamp}"))
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    async fn initiate_push(&self, request: &StkPushRequest) -> GatewayResult<StkPushResponse> {
        let phone = normalize_phone(&request.phone)
            .map_err(|e| GatewayError::InvalidPhone(e.to_string()))?;

        let token = self.access_token().await?;
        let (password, timestamp) = self.derive_password();

        // The provider only accepts whole currency units
        let amount = request.amount.to_whole_units();

        let payload = json!({
            "BusinessShortCode": self.config.short_code,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": phone,
            "PartyB": self.config.short_code,
            "PhoneNumber": phone,
            "CallBackURL": self.config.callback_url,
            "AccountReference": request.account_reference,
            "TransactionDesc": request.description,
        });

        debug!(
            reference = %request.account_reference,
            amount = %amount,
            "Initiating STK push"
        );

        let url = format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let response_code = body
            .get("ResponseCode")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        if response_code != "0" {
            let description = body
                .get("ResponseDescription")
                .and_then(|v| v.as_str())
                .unwrap_or("no description")
                .to_string();
            warn!(code = %response_code, %description, "Push rejected");
            return Err(GatewayError::Rejected {
                code: response_code.to_string(),
                description,
            });
        }

        let checkout_ref = body
            .get("CheckoutRequestID")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("No CheckoutRequestID in response".to_string())
            })?;

        let merchant_ref = body
            .get("MerchantRequestID")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(StkPushResponse {
            checkout_ref,
            merchant_ref,
        })
    }

    async fn query_status(&self, checkout_ref: &str) -> GatewayResult<StkQueryResponse> {
        let token = self.access_token().await?;
        let (password, timestamp) = self.derive_password();

        let payload = json!({
            "BusinessShortCode": self.config.short_code,
            "Password": password,
            "Timestamp": timestamp,
            "CheckoutRequestID": checkout_ref,
        });

        let url = format!("{}/mpesa/stkpushquery/v1/query", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(StkQueryResponse {
            result_code: body
                .get("ResultCode")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            result_desc: body
                .get("ResultDesc")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

// =============================================================================
// Callback Wire Format
// =============================================================================

/// Top-level callback envelope the provider POSTs to the callback URL.
///
/// ## Shape
/// ```json
/// {
///   "Body": {
///     "stkCallback": {
///       "MerchantRequestID": "29115-34620561-1",
///       "CheckoutRequestID": "ws_CO_191220191120469945",
///       "ResultCode": 0,
///       "ResultDesc": "The service request is processed successfully.",
///       "CallbackMetadata": {
///         "Item": [
///           { "Name": "Amount", "Value": 250.0 },
///           { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
///           { "Name": "PhoneNumber", "Value": 254712345678 }
///         ]
///       }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

/// Callback body wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// The callback payload proper.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,

    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,

    /// 0 means the customer paid. Anything else is a failure
    /// (cancelled, timed out, insufficient funds).
    #[serde(rename = "ResultCode")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc")]
    pub result_desc: Option<String>,

    #[serde(rename = "CallbackMetadata")]
    pub metadata: Option<CallbackMetadata>,
}

/// Metadata list attached to successful callbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item")]
    pub items: Vec<MetadataItem>,
}

/// Single name/value metadata entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    /// Whether the customer completed the payment.
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Extracts the provider receipt number, if present.
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Extracts the paying phone number, if present.
    ///
    /// The provider sends this as a bare number, not a string.
    pub fn phone_number(&self) -> Option<String> {
        self.metadata_value("PhoneNumber").map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
    }

    fn metadata_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
