//! Form state machines.
//!
//! Each flow is a plain struct with typed fields and synchronous transition
//! methods. Nothing here touches the network; the orchestrator drives the
//! async steps and calls back into these transitions.
//!
//! Editing an input that a held quote depends on drops the quote and moves
//! the flow back to `CollectingInputs`.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use validator::ValidateEmail;

use super::guard::SubmitGuard;
use super::state::FlowState;
use crate::error::{FlowError, ValidationError};
use crate::gateway::types::{
    DepositRequest, MpesaDepositRequest, MpesaWithdrawRequest, TransferRequest, WithdrawRequest,
};
use crate::money::{CurrencyCode, parse_amount};
use crate::pin::{Pin, coerce_pin, require_pin};
use crate::preview::ConversionQuote;

/// State, last error and last success notice shared by every flow
#[derive(Debug, Clone, Default)]
pub struct FlowStatus {
    state: FlowState,
    error: Option<FlowError>,
    notice: Option<String>,
}

impl FlowStatus {
    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub(crate) fn enter(&mut self, state: FlowState) {
        self.state = state;
        self.error = None;
        self.notice = None;
    }

    pub(crate) fn fail(&mut self, err: FlowError) {
        self.state = FlowState::Failed;
        self.error = Some(err);
    }

    pub(crate) fn finish(&mut self, state: FlowState, notice: impl Into<String>) {
        self.state = state;
        self.error = None;
        self.notice = Some(notice.into());
    }

    /// An input changed: anything past input collection is stale
    fn edited(&mut self) {
        if !self.state.is_busy() {
            self.enter(FlowState::CollectingInputs);
        }
    }
}

/// Access to the shared status of a flow
pub trait Flow: Send {
    const NAME: &'static str;

    fn status(&self) -> &FlowStatus;

    fn status_mut(&mut self) -> &mut FlowStatus;

    fn state(&self) -> FlowState {
        self.status().state()
    }
}

/// One form instance: its flow plus its processing flag.
///
/// The flow lock is never held across an await; every access is a short
/// synchronous closure.
pub struct FormHandle<F> {
    flow: Arc<Mutex<F>>,
    guard: SubmitGuard,
}

impl<F> Clone for FormHandle<F> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<F: Flow> FormHandle<F> {
    pub fn new(flow: F) -> Self {
        Self {
            flow: Arc::new(Mutex::new(flow)),
            guard: SubmitGuard::new(),
        }
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        f(&mut self.flow.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&F) -> R) -> R {
        f(&self.flow.lock())
    }

    pub fn state(&self) -> FlowState {
        self.read(|f| f.state())
    }

    pub fn status(&self) -> FlowStatus {
        self.read(|f| f.status().clone())
    }

    pub fn guard(&self) -> &SubmitGuard {
        &self.guard
    }

    pub fn is_processing(&self) -> bool {
        self.guard.is_busy()
    }
}

fn resolve_currency(
    field: &str,
    shared: Option<&CurrencyCode>,
) -> Result<CurrencyCode, ValidationError> {
    match (field.trim().is_empty(), shared) {
        (true, Some(code)) => Ok(code.clone()),
        (true, None) => Err(ValidationError::MissingCurrency),
        (false, _) => CurrencyCode::parse(field),
    }
}

fn validate_phone(field: &str) -> Result<String, ValidationError> {
    let phone = field.trim();
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.is_empty() {
        return Err(ValidationError::MissingPhone);
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(digits.to_string())
}

// ============================================================================
// Deposit
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DepositFlow {
    amount: String,
    pin: String,
    status: FlowStatus,
}

impl DepositFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn set_amount(&mut self, raw: &str) {
        self.amount = raw.to_string();
        self.status.edited();
    }

    pub fn set_pin(&mut self, raw: &str) {
        self.pin = coerce_pin(raw);
    }

    pub fn submission(&self, pin_required: bool) -> Result<DepositRequest, ValidationError> {
        let amount = parse_amount(&self.amount)?;
        let pin = require_pin(&self.pin, pin_required)?;
        Ok(DepositRequest {
            amount,
            pin: pin.map(|p| p.expose().to_string()),
        })
    }

    pub(crate) fn settle(&mut self, notice: impl Into<String>) {
        self.amount.clear();
        self.pin.clear();
        self.status.finish(FlowState::Settled, notice);
    }
}

impl Flow for DepositFlow {
    const NAME: &'static str = "deposit";

    fn status(&self) -> &FlowStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FlowStatus {
        &mut self.status
    }
}

// ============================================================================
// Converted money movement (withdraw / transfer)
// ============================================================================

/// Amount + target currency + the quote fetched for them
#[derive(Debug, Clone, Default)]
struct Conversion {
    amount: String,
    currency: String,
    pin: String,
    quote: Option<ConversionQuote>,
}

impl Conversion {
    fn preview_inputs(
        &self,
        shared: Option<&CurrencyCode>,
    ) -> Result<(Decimal, CurrencyCode), ValidationError> {
        let amount = parse_amount(&self.amount)?;
        let currency = resolve_currency(&self.currency, shared)?;
        Ok((amount, currency))
    }

    /// Quote valid for the inputs as they are now
    fn current_quote(&self, shared: Option<&CurrencyCode>) -> Option<&ConversionQuote> {
        let (amount, currency) = self.preview_inputs(shared).ok()?;
        self.quote.as_ref().filter(|q| q.matches(amount, &currency))
    }

    fn set_amount(&mut self, raw: &str) {
        self.amount = raw.to_string();
        self.quote = None;
    }

    fn set_currency(&mut self, raw: &str) {
        self.currency = raw.trim().to_string();
        self.quote = None;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct WithdrawFlow {
    conversion: Conversion,
    receiver_email: String,
    status: FlowStatus,
}

impl WithdrawFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(&self) -> &str {
        &self.conversion.amount
    }

    pub fn currency(&self) -> &str {
        &self.conversion.currency
    }

    pub fn receiver_email(&self) -> &str {
        &self.receiver_email
    }

    pub fn set_amount(&mut self, raw: &str) {
        self.conversion.set_amount(raw);
        self.status.edited();
    }

    pub fn set_currency(&mut self, raw: &str) {
        self.conversion.set_currency(raw);
        self.status.edited();
    }

    pub fn set_receiver_email(&mut self, raw: &str) {
        self.receiver_email = raw.trim().to_string();
    }

    pub fn set_pin(&mut self, raw: &str) {
        self.conversion.pin = coerce_pin(raw);
    }

    pub fn pin(&self) -> &str {
        &self.conversion.pin
    }

    pub fn preview_inputs(
        &self,
        shared: Option<&CurrencyCode>,
    ) -> Result<(Decimal, CurrencyCode), ValidationError> {
        self.conversion.preview_inputs(shared)
    }

    pub fn current_quote(&self, shared: Option<&CurrencyCode>) -> Option<&ConversionQuote> {
        self.conversion.current_quote(shared)
    }

    /// Build the mutating request. Needs everything preview needs plus the
    /// receiver email and, when gated, a complete PIN.
    pub fn submission(
        &self,
        shared: Option<&CurrencyCode>,
        pin_required: bool,
    ) -> Result<WithdrawRequest, ValidationError> {
        let (amount, currency_to) = self.preview_inputs(shared)?;
        if self.receiver_email.is_empty() {
            return Err(ValidationError::MissingReceiverEmail);
        }
        if !self.receiver_email.validate_email() {
            return Err(ValidationError::InvalidReceiverEmail);
        }
        let pin = require_pin(&self.conversion.pin, pin_required)?;
        Ok(WithdrawRequest {
            amount,
            currency_to,
            receiver_email: self.receiver_email.clone(),
            pin: pin.map(|p| p.expose().to_string()),
        })
    }

    /// Keep `quote` only if the inputs did not move while it was in flight.
    pub(crate) fn record_quote(
        &mut self,
        quote: ConversionQuote,
        shared: Option<&CurrencyCode>,
    ) -> bool {
        record_quote(&mut self.conversion, &mut self.status, quote, shared)
    }

    pub(crate) fn settle(&mut self, notice: impl Into<String>) {
        self.conversion.clear();
        self.receiver_email.clear();
        self.status.finish(FlowState::Settled, notice);
    }
}

impl Flow for WithdrawFlow {
    const NAME: &'static str = "withdraw";

    fn status(&self) -> &FlowStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FlowStatus {
        &mut self.status
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransferFlow {
    conversion: Conversion,
    recipient: String,
    status: FlowStatus,
}

impl TransferFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(&self) -> &str {
        &self.conversion.amount
    }

    pub fn currency(&self) -> &str {
        &self.conversion.currency
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn set_amount(&mut self, raw: &str) {
        self.conversion.set_amount(raw);
        self.status.edited();
    }

    pub fn set_currency(&mut self, raw: &str) {
        self.conversion.set_currency(raw);
        self.status.edited();
    }

    /// Internal username or email
    pub fn set_recipient(&mut self, raw: &str) {
        self.recipient = raw.trim().to_string();
    }

    pub fn set_pin(&mut self, raw: &str) {
        self.conversion.pin = coerce_pin(raw);
    }

    pub fn pin(&self) -> &str {
        &self.conversion.pin
    }

    pub fn preview_inputs(
        &self,
        shared: Option<&CurrencyCode>,
    ) -> Result<(Decimal, CurrencyCode), ValidationError> {
        self.conversion.preview_inputs(shared)
    }

    pub fn current_quote(&self, shared: Option<&CurrencyCode>) -> Option<&ConversionQuote> {
        self.conversion.current_quote(shared)
    }

    pub fn submission(
        &self,
        shared: Option<&CurrencyCode>,
        pin_required: bool,
    ) -> Result<TransferRequest, ValidationError> {
        let (amount, currency_to) = self.preview_inputs(shared)?;
        if self.recipient.is_empty() {
            return Err(ValidationError::MissingRecipient);
        }
        let pin = require_pin(&self.conversion.pin, pin_required)?;
        Ok(TransferRequest {
            recipient: self.recipient.clone(),
            amount,
            currency_to,
            pin: pin.map(|p| p.expose().to_string()),
        })
    }

    pub(crate) fn record_quote(
        &mut self,
        quote: ConversionQuote,
        shared: Option<&CurrencyCode>,
    ) -> bool {
        record_quote(&mut self.conversion, &mut self.status, quote, shared)
    }

    pub(crate) fn settle(&mut self, notice: impl Into<String>) {
        self.conversion.clear();
        self.recipient.clear();
        self.status.finish(FlowState::Settled, notice);
    }
}

impl Flow for TransferFlow {
    const NAME: &'static str = "transfer";

    fn status(&self) -> &FlowStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FlowStatus {
        &mut self.status
    }
}

/// Flows that convert into a target currency and confirm against a quote
pub trait ConvertedFlow: Flow {
    type Request: PartialEq + Send + Sync;

    fn request(
        &self,
        shared: Option<&CurrencyCode>,
        pin_required: bool,
    ) -> Result<Self::Request, ValidationError>;

    /// The inputs a quote for `req` must match
    fn quoted(req: &Self::Request) -> (Decimal, &CurrencyCode);

    fn held_quote(&self, shared: Option<&CurrencyCode>) -> Option<ConversionQuote>;

    fn accept_quote(&mut self, quote: ConversionQuote, shared: Option<&CurrencyCode>) -> bool;
}

impl ConvertedFlow for WithdrawFlow {
    type Request = WithdrawRequest;

    fn request(
        &self,
        shared: Option<&CurrencyCode>,
        pin_required: bool,
    ) -> Result<WithdrawRequest, ValidationError> {
        self.submission(shared, pin_required)
    }

    fn quoted(req: &WithdrawRequest) -> (Decimal, &CurrencyCode) {
        (req.amount, &req.currency_to)
    }

    fn held_quote(&self, shared: Option<&CurrencyCode>) -> Option<ConversionQuote> {
        self.current_quote(shared).cloned()
    }

    fn accept_quote(&mut self, quote: ConversionQuote, shared: Option<&CurrencyCode>) -> bool {
        self.record_quote(quote, shared)
    }
}

impl ConvertedFlow for TransferFlow {
    type Request = TransferRequest;

    fn request(
        &self,
        shared: Option<&CurrencyCode>,
        pin_required: bool,
    ) -> Result<TransferRequest, ValidationError> {
        self.submission(shared, pin_required)
    }

    fn quoted(req: &TransferRequest) -> (Decimal, &CurrencyCode) {
        (req.amount, &req.currency_to)
    }

    fn held_quote(&self, shared: Option<&CurrencyCode>) -> Option<ConversionQuote> {
        self.current_quote(shared).cloned()
    }

    fn accept_quote(&mut self, quote: ConversionQuote, shared: Option<&CurrencyCode>) -> bool {
        self.record_quote(quote, shared)
    }
}

fn record_quote(
    conversion: &mut Conversion,
    status: &mut FlowStatus,
    quote: ConversionQuote,
    shared: Option<&CurrencyCode>,
) -> bool {
    let still_current = conversion
        .preview_inputs(shared)
        .is_ok_and(|(amount, currency)| quote.matches(amount, &currency));
    if still_current {
        conversion.quote = Some(quote);
        status.enter(FlowState::Previewed);
    } else {
        status.enter(FlowState::CollectingInputs);
    }
    still_current
}

// ============================================================================
// Mobile money
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileMoneyDirection {
    /// STK push: the customer approves a debit on their phone
    Deposit,
    /// Wallet to phone; always PIN-gated
    Withdraw,
}

#[derive(Debug, Clone)]
pub struct MobileMoneyFlow {
    direction: MobileMoneyDirection,
    phone: String,
    amount: String,
    pin: String,
    status: FlowStatus,
}

impl MobileMoneyFlow {
    pub fn new(direction: MobileMoneyDirection) -> Self {
        Self {
            direction,
            phone: String::new(),
            amount: String::new(),
            pin: String::new(),
            status: FlowStatus::default(),
        }
    }

    pub fn direction(&self) -> MobileMoneyDirection {
        self.direction
    }

    pub fn set_phone(&mut self, raw: &str) {
        self.phone = raw.trim().to_string();
        self.status.edited();
    }

    pub fn set_amount(&mut self, raw: &str) {
        self.amount = raw.to_string();
        self.status.edited();
    }

    pub fn set_pin(&mut self, raw: &str) {
        self.pin = coerce_pin(raw);
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn deposit_submission(&self) -> Result<MpesaDepositRequest, ValidationError> {
        let phone = validate_phone(&self.phone)?;
        let amount = parse_amount(&self.amount)?;
        Ok(MpesaDepositRequest { phone, amount })
    }

    pub fn withdraw_submission(&self) -> Result<MpesaWithdrawRequest, ValidationError> {
        let phone = validate_phone(&self.phone)?;
        let amount = parse_amount(&self.amount)?;
        let pin = Pin::from_field(&self.pin)?;
        Ok(MpesaWithdrawRequest {
            phone,
            amount,
            pin: pin.expose().to_string(),
        })
    }

    pub(crate) fn dispatched(&mut self, notice: impl Into<String>) {
        self.amount.clear();
        self.pin.clear();
        self.status.finish(FlowState::Dispatched, notice);
    }
}

impl Flow for MobileMoneyFlow {
    const NAME: &'static str = "mobile_money";

    fn status(&self) -> &FlowStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FlowStatus {
        &mut self.status
    }
}
