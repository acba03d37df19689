//! Registration, login and logout.
//!
//! Login is two-step: `login/` issues an OTP challenge and returns an opaque
//! user reference, which is kept in page storage until `verify-otp/` trades
//! it (plus the OTP) for the credential pair.

use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{FlowError, ValidationError};
use crate::gateway::cache::load_currencies_cached;
use crate::gateway::types::{CurrencyInfo, LoginRequest, RegisterRequest, VerifyOtpRequest};
use crate::gateway::WalletApi;
use crate::money::CurrencyCode;
use crate::navigation::Route;
use crate::pin::Pin;
use crate::session::SessionLifecycle;

const REGISTER_FALLBACK: &str = "Registration failed. Please try again.";
const LOGIN_FALLBACK: &str = "Login failed.";
const VERIFY_FALLBACK: &str = "Invalid OTP.";

/// Registration input as typed by the user.
#[derive(Debug, Clone, Default, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Mobile number is required."))]
    pub mobile: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match!"))]
    pub confirm_password: String,
    pub currency: String,
    /// Optional transaction PIN pair
    pub pin: String,
    pub confirm_pin: String,
}

/// Order in which field errors are reported; the first one wins
const FIELD_ORDER: [&str; 7] = [
    "first_name",
    "last_name",
    "username",
    "email",
    "mobile",
    "password",
    "confirm_password",
];

impl RegisterForm {
    /// Local checks, then the request body.
    pub fn to_request(&self) -> Result<RegisterRequest, ValidationError> {
        let mut form = self.clone();
        form.first_name = form.first_name.trim().to_string();
        form.last_name = form.last_name.trim().to_string();
        form.username = form.username.trim().to_string();
        form.mobile = form.mobile.trim().to_string();
        form.email = form
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        if let Err(errors) = form.validate() {
            let fields = errors.field_errors();
            let first = FIELD_ORDER
                .iter()
                .filter_map(|name| fields.get(*name))
                .chain(fields.values())
                .find_map(|errs| errs.first());
            return Err(match first {
                Some(e) if e.code == "must_match" => ValidationError::PasswordMismatch,
                Some(e) => ValidationError::Form(
                    e.message
                        .as_ref()
                        .map_or_else(|| REGISTER_FALLBACK.to_string(), |m| m.to_string()),
                ),
                None => ValidationError::Form(REGISTER_FALLBACK.to_string()),
            });
        }

        let currency = CurrencyCode::parse(&form.currency)?;
        let (pin, confirm_pin) = match (form.pin.is_empty(), form.confirm_pin.is_empty()) {
            (true, true) => (None, None),
            _ => {
                let pin = Pin::from_field(&form.pin)?;
                if form.pin != form.confirm_pin {
                    return Err(ValidationError::PinMismatch);
                }
                (
                    Some(pin.expose().to_string()),
                    Some(form.confirm_pin.clone()),
                )
            }
        };

        Ok(RegisterRequest {
            first_name: form.first_name,
            last_name: form.last_name,
            username: form.username,
            email: form.email,
            mobile: form.mobile,
            password: form.password,
            confirm_password: form.confirm_password,
            currency,
            pin,
            confirm_pin,
        })
    }
}

/// Fallback catalogue when `currencies/` is unreachable
pub fn default_currencies() -> Vec<CurrencyInfo> {
    vec![CurrencyInfo {
        code: "KES".to_string(),
        name: "Kenyan Shilling".to_string(),
    }]
}

pub struct AuthService {
    api: Arc<dyn WalletApi>,
    lifecycle: SessionLifecycle,
}

impl AuthService {
    pub fn new(api: Arc<dyn WalletApi>, lifecycle: SessionLifecycle) -> Self {
        Self { api, lifecycle }
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<String, FlowError> {
        let req = form.to_request()?;
        let resp = self
            .api
            .register(&req)
            .await
            .map_err(|e| FlowError::from_api(e, REGISTER_FALLBACK))?;

        info!(username = %req.username, currency = %req.currency, "Account registered");
        Ok(resp
            .message
            .unwrap_or_else(|| "Account created successfully!".to_string()))
    }

    /// Supported wallet currencies. Never fails: falls back to KES.
    pub async fn currencies(&self) -> Vec<CurrencyInfo> {
        match load_currencies_cached(self.api.clone()).await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => default_currencies(),
            Err(e) => {
                warn!(error = %e, "Currency catalogue unavailable, using fallback");
                default_currencies()
            }
        }
    }

    /// Start a login. On success the OTP challenge is pending.
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<String, FlowError> {
        let username_or_email = username_or_email.trim();
        if username_or_email.is_empty() || password.is_empty() {
            return Err(ValidationError::Form(
                "Enter your username or email and password.".to_string(),
            )
            .into());
        }

        let req = LoginRequest {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .api
            .login(&req)
            .await
            .map_err(|e| FlowError::from_api(e, LOGIN_FALLBACK))?;

        self.lifecycle.session().set_login_challenge(resp.user_id);
        info!("Login challenge issued");
        self.lifecycle.navigator().navigate(Route::VerifyOtp);
        Ok("OTP sent to your email. Please verify.".to_string())
    }

    /// Complete the login with the OTP. Writes the credential on success.
    pub async fn verify_otp(&self, otp: &str) -> Result<String, FlowError> {
        let session = self.lifecycle.session();
        let user_id = session
            .login_challenge()
            .ok_or(ValidationError::MissingLoginChallenge)?;
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(ValidationError::MissingOtp.into());
        }

        let req = VerifyOtpRequest {
            user_id,
            otp: otp.to_string(),
        };
        let resp = self
            .api
            .verify_otp(&req)
            .await
            .map_err(|e| FlowError::from_api(e, VERIFY_FALLBACK))?;

        let Some(access) = resp.access else {
            warn!("OTP accepted but no access token in response");
            return Err(FlowError::Transport(
                "verify-otp response carried no access token".to_string(),
            ));
        };
        session.set(access, resp.refresh.unwrap_or_default());
        session.take_login_challenge();
        info!("OTP verified, session started");
        self.lifecycle.navigator().navigate(Route::Wallet);
        Ok("OTP verified successfully! Redirecting...".to_string())
    }

    pub fn logout(&self) {
        self.lifecycle.force_logout("user logout");
    }
}
