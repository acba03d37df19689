//! wallet_client - Multi-Currency Wallet Client Core
//!
//! Session lifecycle, OTP login and money movement against the wallet
//! backend, with no rendering layer.
//!
//! # Modules
//!
//! - [`session`] - credential store, forced logout, inactivity monitor
//! - [`navigation`] - route seam to the host UI
//! - [`gateway`] - HTTP client with the bearer interceptor
//! - [`preview`] - non-committing conversion quotes
//! - [`sync`] - profile refetch and the displayed balance
//! - [`flows`] - deposit / withdraw / transfer / mobile-money state machines
//! - [`auth`] - registration, login, OTP verification, logout
//! - [`money`] - amount parsing, currency codes, balance formatting
//! - [`pin`] - transaction PIN coercion and validation
//! - [`error`] - the four-kind error taxonomy
//!
//! ```text
//! UI event ──► Orchestrator ──► Preview ──► Confirm ──► Gateway (mutating)
//!                                                          │
//!                    re-render ◄── Profile Sync ◄── provisional balance
//! ```

// Leaf types
pub mod error;
pub mod money;
pub mod pin;

// Configuration and logging
pub mod config;
pub mod logging;

// Session lifecycle
pub mod navigation;
pub mod session;

// Backend access
pub mod gateway;
pub mod preview;
pub mod sync;

// User-facing flows
pub mod auth;
pub mod flows;

// Convenient re-exports at crate root
pub use auth::{AuthService, RegisterForm};
pub use config::AppConfig;
pub use error::{ErrorKind, FlowError, ValidationError};
pub use flows::{
    AutoConfirm, ConfirmPrompt, Confirmer, DepositFlow, FlowState, FormHandle,
    MobileMoneyDirection, MobileMoneyFlow, MoneyMovementOrchestrator, SubmitOutcome,
    TransferFlow, WithdrawFlow,
};
pub use gateway::{ApiError, ApiGateway, Endpoint, WalletApi};
pub use money::{CurrencyCode, format_balance, parse_amount};
pub use navigation::{NavigationLog, Navigator, Route};
pub use pin::{Pin, coerce_pin};
pub use preview::{ConversionQuote, PreviewService};
pub use session::{
    ActivityHandle, ActivitySignal, Credential, InactivityMonitor, KeyValueStorage, PageStorage,
    SessionContext, SessionLifecycle, SessionStore,
};
pub use sync::{BalanceDisplay, BalanceSource, ProfileSync, WalletState};
