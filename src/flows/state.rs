//! Flow FSM states
//!
//! ```text
//!   CollectingInputs ──► Previewing ──► Previewed ──► Confirming ──► Submitting ──► Settled
//!         ▲                  │              │              │              │
//!         └──── input edit ──┴──────────────┘              │              ├──► Dispatched (mobile money)
//!                                                          └──► (declined) └──► Failed
//! ```
//!
//! Deposit skips the preview states. Mobile-money flows end in `Dispatched`:
//! the push was sent, settlement is only observable through a resync.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowState {
    #[default]
    CollectingInputs,

    /// Quote request in flight
    Previewing,

    /// Quote held for the current amount + currency
    Previewed,

    /// Waiting on the user's explicit confirmation
    Confirming,

    /// Mutating request in flight
    Submitting,

    /// Terminal: server applied the operation
    Settled,

    /// Terminal: mobile-money push sent, outcome pending out of band
    Dispatched,

    /// Terminal: validation, business, auth or transport failure
    Failed,
}

impl FlowState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Settled | FlowState::Dispatched | FlowState::Failed
        )
    }

    /// States where a request is outstanding
    #[inline]
    pub fn is_busy(&self) -> bool {
        matches!(self, FlowState::Previewing | FlowState::Submitting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::CollectingInputs => "COLLECTING_INPUTS",
            FlowState::Previewing => "PREVIEWING",
            FlowState::Previewed => "PREVIEWED",
            FlowState::Confirming => "CONFIRMING",
            FlowState::Submitting => "SUBMITTING",
            FlowState::Settled => "SETTLED",
            FlowState::Dispatched => "DISPATCHED",
            FlowState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
