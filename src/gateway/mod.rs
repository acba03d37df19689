//! API gateway
//!
//! - [`endpoint`] - route table (path, method, bearer requirement)
//! - [`types`] - request/response bodies
//! - [`client`] - the reqwest client and its request interceptor
//! - [`cache`] - TTL cache for the currency catalogue
//!
//! Flows talk to the backend only through the [`WalletApi`] trait so they can
//! be driven by [`mock::MockWalletApi`] in unit tests.

pub mod cache;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod types;

pub use client::ApiGateway;
pub use endpoint::{Endpoint, Method};
pub use error::{ApiError, server_message};

use async_trait::async_trait;
use types::*;

/// Typed view of every backend call.
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Stable identity of the backend this client talks to (used as cache key)
    fn origin(&self) -> String;

    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ApiError>;

    async fn currencies(&self) -> Result<CurrenciesResponse, ApiError>;

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError>;

    async fn profile(&self) -> Result<WalletProfile, ApiError>;

    async fn deposit(&self, req: &DepositRequest) -> Result<DepositResponse, ApiError>;

    async fn withdraw(&self, req: &WithdrawRequest) -> Result<WithdrawResponse, ApiError>;

    async fn transfer(&self, req: &TransferRequest) -> Result<TransferResponse, ApiError>;

    /// Non-committing quote
    async fn convert_preview(&self, req: &PreviewRequest) -> Result<PreviewResponse, ApiError>;

    /// Initiates an STK push; success means dispatched, not settled
    async fn mpesa_deposit(
        &self,
        req: &MpesaDepositRequest,
    ) -> Result<MpesaDepositResponse, ApiError>;

    async fn mpesa_withdraw(
        &self,
        req: &MpesaWithdrawRequest,
    ) -> Result<MpesaWithdrawResponse, ApiError>;

    async fn update_currency(
        &self,
        req: &CurrencyUpdateRequest,
    ) -> Result<CurrencyUpdateResponse, ApiError>;
}
