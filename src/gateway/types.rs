//! Request/response bodies for the wallet backend.
//!
//! Amounts are `Decimal` and serialize as JSON strings so no precision is
//! lost on the way out. Responses accept either strings or numbers.
//! Field aliases cover the naming differences between backend revisions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::money::CurrencyCode;

/// Opaque identifiers (user ids, wallet ids) come back as numbers or strings
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected id, got {}", other))),
    }
}

// ============================================================================
// Registration / login
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub mobile: String,
    pub password: String,
    pub confirm_password: String,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_pin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrenciesResponse {
    #[serde(default)]
    pub currencies: Vec<CurrencyInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(deserialize_with = "opaque_id")]
    pub user_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub user_id: String,
    pub otp: String,
}

#[derive(Clone, Deserialize)]
pub struct VerifyOtpResponse {
    #[serde(default, alias = "access_token", alias = "token")]
    pub access: Option<String>,
    #[serde(default, alias = "refresh_token")]
    pub refresh: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Debug for VerifyOtpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyOtpResponse")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .field("message", &self.message)
            .finish()
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Server-assigned, read-only history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type", alias = "transaction_type")]
    pub kind: String,
    pub amount: Decimal,
    #[serde(default, alias = "currency_from")]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Canonical wallet state as returned by `user/profile/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    #[serde(alias = "id", deserialize_with = "opaque_id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(alias = "currency")]
    pub wallet_currency: CurrencyCode,
    #[serde(alias = "balance")]
    pub wallet_balance: Decimal,
    /// Most recent first, exactly as the server ordered them
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// Money movement
// ============================================================================

#[derive(Clone, PartialEq, Serialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub new_balance: Decimal,
}

#[derive(Clone, PartialEq, Serialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
    pub currency_to: CurrencyCode,
    pub receiver_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawResponse {
    #[serde(default)]
    pub converted_amount: Option<Decimal>,
    pub new_balance: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: Decimal,
    pub currency_to: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferResponse {
    pub sender_balance: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRequest {
    pub amount: Decimal,
    pub currency_to: CurrencyCode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewResponse {
    pub converted_amount: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MpesaDepositRequest {
    pub phone: String,
    pub amount: Decimal,
}

/// Push dispatched to the phone. Says nothing about settlement.
#[derive(Debug, Clone, Deserialize)]
pub struct MpesaDepositResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
}

#[derive(Clone, PartialEq, Serialize)]
pub struct MpesaWithdrawRequest {
    pub phone: String,
    pub amount: Decimal,
    pub pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpesaWithdrawResponse {
    #[serde(default)]
    pub new_balance: Option<Decimal>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyUpdateRequest {
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyUpdateResponse {
    pub currency: CurrencyCode,
    #[serde(default)]
    pub message: Option<String>,
}

// PIN-bearing requests keep the PIN out of Debug output
macro_rules! redacted_debug {
    ($ty:ident { $($field:ident),* }) => {
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    .field("pin", &"<redacted>")
                    .finish()
            }
        }
    };
}

redacted_debug!(DepositRequest { amount });
redacted_debug!(WithdrawRequest { amount, currency_to, receiver_email });
redacted_debug!(TransferRequest { recipient, amount, currency_to });
redacted_debug!(MpesaWithdrawRequest { phone, amount });
