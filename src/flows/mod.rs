//! Money-movement flows
//!
//! - [`state`] - FSM states shared by every flow
//! - [`forms`] - per-form state machines (pure, no I/O)
//! - [`guard`] - per-form processing flag
//! - [`confirm`] - explicit user confirmation seam
//! - [`orchestrator`] - async driver: preview, confirm, submit, reconcile

pub mod confirm;
pub mod forms;
pub mod guard;
pub mod orchestrator;
pub mod state;

pub use confirm::{AutoConfirm, ConfirmPrompt, Confirmer};
pub use forms::{
    ConvertedFlow, DepositFlow, Flow, FlowStatus, FormHandle, MobileMoneyDirection, MobileMoneyFlow,
    TransferFlow, WithdrawFlow,
};
pub use guard::{SubmitGuard, SubmitPermit};
pub use orchestrator::{MoneyMovementOrchestrator, SubmitOutcome};
pub use state::FlowState;
