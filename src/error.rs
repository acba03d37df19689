//! Error taxonomy for money-movement and session flows.
//!
//! Every failure surfaced to the user is one of four kinds:
//!
//! | Kind       | Origin                          | Request issued? | Recovery                     |
//! |------------|---------------------------------|-----------------|------------------------------|
//! | Validation | local input checks              | no              | fix the input                |
//! | Auth       | missing / rejected credential   | maybe           | session cleared, go to login |
//! | Business   | server rejected the operation   | yes             | server message or fallback   |
//! | Transport  | connection / timeout / decoding | unknown         | try again                    |

use std::fmt;
use thiserror::Error;

use crate::gateway::ApiError;

/// Local, pre-network input errors. The `Display` text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter an amount.")]
    EmptyAmount,

    #[error("Amount must be a number.")]
    NonNumericAmount,

    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,

    #[error("Enter your 6-digit PIN.")]
    PinRequired,

    #[error("PINs do not match.")]
    PinMismatch,

    #[error("Enter the recipient's username or email.")]
    MissingRecipient,

    #[error("Enter the receiver's email.")]
    MissingReceiverEmail,

    #[error("Enter a valid receiver email.")]
    InvalidReceiverEmail,

    #[error("Enter a phone number.")]
    MissingPhone,

    #[error("Phone number must contain only digits.")]
    InvalidPhone,

    #[error("Select a target currency.")]
    MissingCurrency,

    #[error("Unknown currency code: {0}")]
    InvalidCurrency(String),

    #[error("The amount or details changed. Review and confirm again.")]
    InputsChanged,

    #[error("Passwords do not match!")]
    PasswordMismatch,

    #[error("{0}")]
    Form(String),

    #[error("User ID not found. Please log in again.")]
    MissingLoginChallenge,

    #[error("Enter the OTP code.")]
    MissingOtp,
}

/// The four user-visible failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Business,
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Auth => "AUTH",
            ErrorKind::Business => "BUSINESS",
            ErrorKind::Transport => "TRANSPORT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const TRANSPORT_MESSAGE: &str = "Could not reach the server. Please try again.";

/// Classified failure of a flow step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Session was cleared; the caller has already been redirected to login
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    Auth,

    #[error("{0}")]
    Business(String),

    /// Detail is for logs; `user_message()` hides it
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Validation(_) => ErrorKind::Validation,
            FlowError::Auth => ErrorKind::Auth,
            FlowError::Business(_) => ErrorKind::Business,
            FlowError::Transport(_) => ErrorKind::Transport,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "VALIDATION_ERROR",
            FlowError::Auth => "SESSION_EXPIRED",
            FlowError::Business(_) => "REJECTED",
            FlowError::Transport(_) => "TRANSPORT_ERROR",
        }
    }

    /// Text to put in front of the user
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Map a gateway failure that is not an auth failure.
    ///
    /// The server's message wins over `fallback`. Auth failures must go
    /// through the session lifecycle first so they are never classified here.
    pub fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Unauthorized | ApiError::MissingCredential => FlowError::Auth,
            ApiError::Rejected { message, .. } => {
                FlowError::Business(message.unwrap_or_else(|| fallback.to_string()))
            }
            ApiError::Transport(detail) | ApiError::Decode(detail) => FlowError::Transport(detail),
        }
    }
}
