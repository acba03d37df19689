//! reqwest-backed gateway.
//!
//! Every call goes through [`ApiGateway::execute`], which plays the role of
//! the request interceptor: it reads the session, attaches the bearer token
//! and maps the response into [`ApiError`].

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::WalletApi;
use super::endpoint::{Endpoint, Method};
use super::error::{ApiError, server_message};
use super::types::*;
use crate::config::ApiConfig;
use crate::session::SessionContext;

/// Marker the backend's JWT layer puts in 401/403 bodies for dead tokens
const TOKEN_NOT_VALID: &str = "token_not_valid";

pub struct ApiGateway {
    client: reqwest::Client,
    base_url: Url,
    session: SessionContext,
    request_seq: AtomicU64,
}

impl ApiGateway {
    pub fn new(config: &ApiConfig, session: SessionContext) -> Result<Self, ApiError> {
        Self::with_timeout(&config.base_url, config.request_timeout(), session)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        session: SessionContext,
    ) -> Result<Self, ApiError> {
        // `Url::join` drops the last segment unless the base ends with '/'
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ApiError::Transport(format!("Invalid base URL {}: {}", base, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            session,
            request_seq: AtomicU64::new(0),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Single outbound request path.
    async fn execute<B, R>(&self, endpoint: Endpoint, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let seq = self.request_seq.fetch_add(1, Ordering::Relaxed);
        let url = self
            .base_url
            .join(endpoint.path())
            .map_err(|e| ApiError::Transport(format!("Invalid endpoint URL: {}", e)))?;

        let mut request = match endpoint.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };

        match self.session.get() {
            Some(credential) => request = request.bearer_auth(&credential.access_token),
            None if endpoint.requires_auth() => {
                debug!(seq, %endpoint, "No credential, bearer request not sent");
                return Err(ApiError::MissingCredential);
            }
            None => {}
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(seq, %endpoint, "Sending request");
        let response = request.send().await.map_err(|e| {
            warn!(seq, %endpoint, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!(seq, %endpoint, error = %e, "Failed to read response body");
            ApiError::from(e)
        })?;
        debug!(seq, %endpoint, status = status.as_u16(), "Response received");

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| {
                error!(seq, %endpoint, error = %e, "Unexpected response body");
                ApiError::Decode(e.to_string())
            });
        }

        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        if endpoint.requires_auth() && is_auth_rejection(status, &body) {
            warn!(seq, %endpoint, status = status.as_u16(), "Credential rejected");
            return Err(ApiError::Unauthorized);
        }

        let message = server_message(&body);
        warn!(
            seq,
            %endpoint,
            status = status.as_u16(),
            message = message.as_deref().unwrap_or(""),
            "Request rejected"
        );
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn is_auth_rejection(status: StatusCode, body: &Value) -> bool {
    match status {
        StatusCode::UNAUTHORIZED => true,
        StatusCode::FORBIDDEN => {
            body.get("code").and_then(Value::as_str) == Some(TOKEN_NOT_VALID)
                || body
                    .get("detail")
                    .and_then(Value::as_str)
                    .is_some_and(|d| d.to_ascii_lowercase().contains("token not valid"))
        }
        _ => false,
    }
}

#[async_trait]
impl WalletApi for ApiGateway {
    fn origin(&self) -> String {
        self.base_url.to_string()
    }

    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.execute(Endpoint::Register, Some(req)).await
    }

    async fn currencies(&self) -> Result<CurrenciesResponse, ApiError> {
        self.execute::<(), _>(Endpoint::Currencies, None).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.execute(Endpoint::Login, Some(req)).await
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError> {
        self.execute(Endpoint::VerifyOtp, Some(req)).await
    }

    async fn profile(&self) -> Result<WalletProfile, ApiError> {
        self.execute::<(), _>(Endpoint::Profile, None).await
    }

    async fn deposit(&self, req: &DepositRequest) -> Result<DepositResponse, ApiError> {
        self.execute(Endpoint::Deposit, Some(req)).await
    }

    async fn withdraw(&self, req: &WithdrawRequest) -> Result<WithdrawResponse, ApiError> {
        self.execute(Endpoint::Withdraw, Some(req)).await
    }

    async fn transfer(&self, req: &TransferRequest) -> Result<TransferResponse, ApiError> {
        self.execute(Endpoint::Transfer, Some(req)).await
    }

    async fn convert_preview(&self, req: &PreviewRequest) -> Result<PreviewResponse, ApiError> {
        self.execute(Endpoint::ConvertPreview, Some(req)).await
    }

    async fn mpesa_deposit(
        &self,
        req: &MpesaDepositRequest,
    ) -> Result<MpesaDepositResponse, ApiError> {
        self.execute(Endpoint::MpesaStk, Some(req)).await
    }

    async fn mpesa_withdraw(
        &self,
        req: &MpesaWithdrawRequest,
    ) -> Result<MpesaWithdrawResponse, ApiError> {
        self.execute(Endpoint::MpesaWithdraw, Some(req)).await
    }

    async fn update_currency(
        &self,
        req: &CurrencyUpdateRequest,
    ) -> Result<CurrencyUpdateResponse, ApiError> {
        self.execute(Endpoint::WalletCurrency, Some(req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use serde_json::json;

    fn gateway(base: &str) -> ApiGateway {
        ApiGateway::with_timeout(base, Duration::from_secs(1), SessionStore::page_scoped()).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let gw = gateway("http://localhost:8000/api");
        assert_eq!(gw.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            gw.base_url().join(Endpoint::Profile.path()).unwrap().as_str(),
            "http://localhost:8000/api/user/profile/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiGateway::with_timeout(
            "not a url",
            Duration::from_secs(1),
            SessionStore::page_scoped(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn test_bearer_call_without_session_sends_nothing() {
        // Port 9 (discard) is never contacted: the call must fail before I/O
        let gw = gateway("http://127.0.0.1:9/api/");
        assert_eq!(gw.profile().await.err(), Some(ApiError::MissingCredential));
        let req = DepositRequest {
            amount: rust_decimal::Decimal::ONE,
            pin: None,
        };
        assert_eq!(gw.deposit(&req).await.err(), Some(ApiError::MissingCredential));
    }

    #[test]
    fn test_auth_rejection_detection() {
        assert!(is_auth_rejection(StatusCode::UNAUTHORIZED, &Value::Null));
        assert!(is_auth_rejection(
            StatusCode::FORBIDDEN,
            &json!({"code": "token_not_valid", "detail": "Given token not valid for any token type"})
        ));
        assert!(is_auth_rejection(
            StatusCode::FORBIDDEN,
            &json!({"detail": "Given token not valid for any token type"})
        ));
        assert!(!is_auth_rejection(
            StatusCode::FORBIDDEN,
            &json!({"error": "Invalid PIN"})
        ));
        assert!(!is_auth_rejection(StatusCode::BAD_REQUEST, &Value::Null));
    }
}
