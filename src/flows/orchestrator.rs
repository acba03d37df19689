//! Money-Movement Orchestrator
//!
//! Drives the flow state machines through their async steps:
//!
//! ```text
//!   validate ──► [preview ──► confirm] ──► submit ──► provisional balance ──► sync
//! ```
//!
//! Every step runs under the form's [`SubmitPermit`](super::guard::SubmitPermit),
//! taken before the first await. Every failure is classified into a
//! [`FlowError`] before the form or wallet state is touched, and auth failures
//! end the session before the error is returned.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::confirm::{ConfirmPrompt, Confirmer};
use super::forms::{
    ConvertedFlow, DepositFlow, Flow, FormHandle, MobileMoneyDirection, MobileMoneyFlow, TransferFlow,
    WithdrawFlow,
};
use super::state::FlowState;
use crate::config::{CurrencyScope, FlowConfig};
use crate::error::{FlowError, ValidationError};
use crate::gateway::types::CurrencyUpdateRequest;
use crate::gateway::{ApiError, WalletApi};
use crate::money::CurrencyCode;
use crate::preview::{ConversionQuote, PreviewService};
use crate::session::SessionLifecycle;
use crate::sync::ProfileSync;

const DEPOSIT_FALLBACK: &str = "Deposit failed.";
const WITHDRAW_FALLBACK: &str = "Withdrawal failed.";
const TRANSFER_FALLBACK: &str = "Transfer failed.";
const MPESA_DEPOSIT_FALLBACK: &str = "Could not start the M-Pesa payment.";
const MPESA_WITHDRAW_FALLBACK: &str = "M-Pesa withdrawal failed.";
const CURRENCY_FALLBACK: &str = "Could not update the wallet currency.";

/// Quotes fetched before giving up on inputs that keep changing
const MAX_QUOTE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Server applied the operation; `balance` is the provisional value shown
    Settled {
        message: String,
        balance: Option<Decimal>,
    },
    /// Mobile-money push sent; the outcome arrives with the delayed resync
    Dispatched { message: String },
    /// Another submission on this form is still pending; nothing was sent
    AlreadyInFlight,
    /// The user said no at the confirmation step; nothing was sent
    Declined,
}

pub struct MoneyMovementOrchestrator {
    api: Arc<dyn WalletApi>,
    preview: PreviewService,
    sync: ProfileSync,
    lifecycle: SessionLifecycle,
    config: FlowConfig,
    shared_currency: RwLock<Option<CurrencyCode>>,
}

impl MoneyMovementOrchestrator {
    pub fn new(
        api: Arc<dyn WalletApi>,
        sync: ProfileSync,
        lifecycle: SessionLifecycle,
        config: FlowConfig,
    ) -> Self {
        let shared_currency = match config.currency_scope {
            CurrencyScope::Shared => CurrencyCode::parse(&config.default_currency).ok(),
            CurrencyScope::PerFlow => None,
        };
        Self {
            preview: PreviewService::new(api.clone()),
            api,
            sync,
            lifecycle,
            config,
            shared_currency: RwLock::new(shared_currency),
        }
    }

    pub fn sync(&self) -> &ProfileSync {
        &self.sync
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Shared target currency, only meaningful with `CurrencyScope::Shared`
    pub fn shared_currency(&self) -> Option<CurrencyCode> {
        match self.config.currency_scope {
            CurrencyScope::Shared => self.shared_currency.read().clone(),
            CurrencyScope::PerFlow => None,
        }
    }

    pub fn select_currency(&self, raw: &str) -> Result<CurrencyCode, ValidationError> {
        let code = CurrencyCode::parse(raw)?;
        *self.shared_currency.write() = Some(code.clone());
        Ok(code)
    }

    // ========================================================================
    // Deposit
    // ========================================================================

    pub async fn deposit(
        &self,
        form: &FormHandle<DepositFlow>,
    ) -> Result<SubmitOutcome, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            return Ok(in_flight::<DepositFlow>());
        };

        let req = self.validated(form, |f| f.submission(self.config.pin.deposit))?;
        form.edit(|f| f.status_mut().enter(FlowState::Submitting));

        let resp = match self.api.deposit(&req).await {
            Ok(resp) => resp,
            Err(e) => return Err(self.reject(form, e, DEPOSIT_FALLBACK)),
        };

        let message = resp
            .message
            .unwrap_or_else(|| "Deposit successful".to_string());
        info!(amount = %req.amount, new_balance = %resp.new_balance, "Deposit settled");
        self.sync.apply_provisional(resp.new_balance);
        form.edit(|f| f.settle(message.clone()));
        self.reconcile().await;

        Ok(SubmitOutcome::Settled {
            message,
            balance: Some(resp.new_balance),
        })
    }

    // ========================================================================
    // Withdraw
    // ========================================================================

    /// Fetch a quote for the form's current amount + currency. Never mutates.
    ///
    /// Returns `None` when another request on this form is pending.
    pub async fn preview_withdrawal(
        &self,
        form: &FormHandle<WithdrawFlow>,
    ) -> Result<Option<ConversionQuote>, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            debug!(flow = WithdrawFlow::NAME, "Preview ignored, request in flight");
            return Ok(None);
        };
        let shared = self.shared_currency();
        let (amount, currency) = self.validated(form, |f| f.preview_inputs(shared.as_ref()))?;

        let quote = self.fetch_quote(form, None, amount, &currency).await?;
        form.edit(|f| f.record_quote(quote.clone(), shared.as_ref()));
        Ok(Some(quote))
    }

    /// Confirm and submit. Reuses the held quote when it still matches the
    /// inputs, otherwise previews again first.
    pub async fn submit_withdrawal(
        &self,
        form: &FormHandle<WithdrawFlow>,
        confirmer: &dyn Confirmer,
    ) -> Result<SubmitOutcome, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            return Ok(in_flight::<WithdrawFlow>());
        };
        let pin_required = self.config.pin.withdraw;
        let (req, quote) = self.quote_request(form, pin_required, true).await?;

        let prompt = ConfirmPrompt {
            action: "Withdraw",
            counterparty: req.receiver_email.clone(),
            source_currency: self.sync.snapshot().currency().cloned(),
            quote,
        };
        if !self.confirm(form, confirmer, &prompt).await {
            return Ok(SubmitOutcome::Declined);
        }
        self.ensure_unchanged(form, &req, pin_required)?;

        form.edit(|f| f.status_mut().enter(FlowState::Submitting));
        let resp = match self.api.withdraw(&req).await {
            Ok(resp) => resp,
            Err(e) => return Err(self.reject(form, e, WITHDRAW_FALLBACK)),
        };

        let message = resp
            .message
            .unwrap_or_else(|| "Withdrawal successful".to_string());
        info!(
            amount = %req.amount,
            currency_to = %req.currency_to,
            converted = ?resp.converted_amount,
            new_balance = %resp.new_balance,
            "Withdrawal settled"
        );
        self.sync.apply_provisional(resp.new_balance);
        form.edit(|f| f.settle(message.clone()));
        self.reconcile().await;

        Ok(SubmitOutcome::Settled {
            message,
            balance: Some(resp.new_balance),
        })
    }

    // ========================================================================
    // Transfer
    // ========================================================================

    /// Optional early quote for display while the user is still typing.
    pub async fn preview_transfer(
        &self,
        form: &FormHandle<TransferFlow>,
    ) -> Result<Option<ConversionQuote>, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            debug!(flow = TransferFlow::NAME, "Preview ignored, request in flight");
            return Ok(None);
        };
        let shared = self.shared_currency();
        let (amount, currency) = self.validated(form, |f| f.preview_inputs(shared.as_ref()))?;

        let quote = self.fetch_quote(form, None, amount, &currency).await?;
        form.edit(|f| f.record_quote(quote.clone(), shared.as_ref()));
        Ok(Some(quote))
    }

    /// Fresh preview, explicit confirmation, then the transfer itself.
    ///
    /// The quote is always re-fetched here, even if one is held, so the user
    /// confirms against the current rate.
    pub async fn transfer(
        &self,
        form: &FormHandle<TransferFlow>,
        confirmer: &dyn Confirmer,
    ) -> Result<SubmitOutcome, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            return Ok(in_flight::<TransferFlow>());
        };
        let pin_required = self.config.pin.transfer;
        let (req, quote) = self.quote_request(form, pin_required, false).await?;

        let prompt = ConfirmPrompt {
            action: "Send",
            counterparty: req.recipient.clone(),
            source_currency: self.sync.snapshot().currency().cloned(),
            quote,
        };
        if !self.confirm(form, confirmer, &prompt).await {
            return Ok(SubmitOutcome::Declined);
        }
        self.ensure_unchanged(form, &req, pin_required)?;

        form.edit(|f| f.status_mut().enter(FlowState::Submitting));
        let resp = match self.api.transfer(&req).await {
            Ok(resp) => resp,
            Err(e) => return Err(self.reject(form, e, TRANSFER_FALLBACK)),
        };

        let message = resp
            .message
            .unwrap_or_else(|| "Transfer successful".to_string());
        info!(
            amount = %req.amount,
            currency_to = %req.currency_to,
            sender_balance = %resp.sender_balance,
            "Transfer settled"
        );
        self.sync.apply_provisional(resp.sender_balance);
        form.edit(|f| f.settle(message.clone()));
        self.reconcile().await;

        Ok(SubmitOutcome::Settled {
            message,
            balance: Some(resp.sender_balance),
        })
    }

    // ========================================================================
    // Mobile money
    // ========================================================================

    /// Start an M-Pesa deposit or withdrawal.
    ///
    /// Success only means the request was dispatched. The flow ends in
    /// `Dispatched` and a profile resync is scheduled after the configured
    /// delay; an out-of-band failure shows up only there.
    pub async fn mobile_money(
        &self,
        form: &FormHandle<MobileMoneyFlow>,
    ) -> Result<SubmitOutcome, FlowError> {
        let Some(_permit) = form.guard().try_acquire() else {
            return Ok(in_flight::<MobileMoneyFlow>());
        };

        let message = match form.read(|f| f.direction()) {
            MobileMoneyDirection::Deposit => {
                let req = self.validated(form, |f| f.deposit_submission())?;
                form.edit(|f| f.status_mut().enter(FlowState::Submitting));
                let resp = match self.api.mpesa_deposit(&req).await {
                    Ok(resp) => resp,
                    Err(e) => return Err(self.reject(form, e, MPESA_DEPOSIT_FALLBACK)),
                };
                info!(
                    amount = %req.amount,
                    checkout = resp.checkout_request_id.as_deref().unwrap_or(""),
                    "M-Pesa STK push dispatched"
                );
                resp.message
                    .unwrap_or_else(|| "Check your phone to complete the payment.".to_string())
            }
            MobileMoneyDirection::Withdraw => {
                let req = self.validated(form, |f| f.withdraw_submission())?;
                form.edit(|f| f.status_mut().enter(FlowState::Submitting));
                let resp = match self.api.mpesa_withdraw(&req).await {
                    Ok(resp) => resp,
                    Err(e) => return Err(self.reject(form, e, MPESA_WITHDRAW_FALLBACK)),
                };
                info!(amount = %req.amount, "M-Pesa withdrawal dispatched");
                if let Some(balance) = resp.new_balance {
                    self.sync.apply_provisional(balance);
                }
                resp.message
                    .unwrap_or_else(|| "Withdrawal initiated.".to_string())
            }
        };

        form.edit(|f| f.dispatched(message.clone()));
        self.sync
            .schedule_resync(self.config.mobile_money_resync_delay());
        Ok(SubmitOutcome::Dispatched { message })
    }

    // ========================================================================
    // Wallet currency
    // ========================================================================

    /// Change the wallet's base currency, then resync.
    pub async fn update_currency(&self, raw: &str) -> Result<CurrencyCode, FlowError> {
        let currency = CurrencyCode::parse(raw)?;
        let req = CurrencyUpdateRequest { currency };
        let resp = self
            .api
            .update_currency(&req)
            .await
            .map_err(|e| self.classify(e, CURRENCY_FALLBACK))?;

        info!(currency = %resp.currency, "Wallet currency updated");
        self.reconcile().await;
        Ok(resp.currency)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Run a pure validation step; a failure marks the form failed.
    fn validated<F: Flow, T>(
        &self,
        form: &FormHandle<F>,
        step: impl FnOnce(&F) -> Result<T, ValidationError>,
    ) -> Result<T, FlowError> {
        form.edit(|f| match step(f) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(flow = F::NAME, error = %e, "Validation failed");
                let err = FlowError::from(e);
                f.status_mut().fail(err.clone());
                Err(err)
            }
        })
    }

    async fn fetch_quote<F: Flow>(
        &self,
        form: &FormHandle<F>,
        held: Option<&ConversionQuote>,
        amount: Decimal,
        currency: &CurrencyCode,
    ) -> Result<ConversionQuote, FlowError> {
        form.edit(|f| f.status_mut().enter(FlowState::Previewing));
        match self.preview.quote_for(held, amount, currency).await {
            Ok(quote) => Ok(quote),
            Err(e) => {
                let err = self.escalate(e);
                form.edit(|f| f.status_mut().fail(err.clone()));
                Err(err)
            }
        }
    }

    /// Build the request and quote it, starting over whenever the inputs
    /// moved while the quote was in flight.
    async fn quote_request<F: ConvertedFlow>(
        &self,
        form: &FormHandle<F>,
        pin_required: bool,
        reuse_held: bool,
    ) -> Result<(F::Request, ConversionQuote), FlowError> {
        for attempt in 1..=MAX_QUOTE_ATTEMPTS {
            let shared = self.shared_currency();
            let req = self.validated(form, |f| f.request(shared.as_ref(), pin_required))?;
            let held = if reuse_held {
                form.read(|f| f.held_quote(shared.as_ref()))
            } else {
                None
            };

            let (amount, currency) = F::quoted(&req);
            let quote = self.fetch_quote(form, held.as_ref(), amount, currency).await?;

            let shared = self.shared_currency();
            let current = form.edit(|f| {
                f.request(shared.as_ref(), pin_required)
                    .is_ok_and(|now| now == req)
                    && f.accept_quote(quote.clone(), shared.as_ref())
            });
            if current {
                return Ok((req, quote));
            }
            debug!(flow = F::NAME, attempt, "Inputs changed during preview, quoting again");
        }
        Err(self.inputs_changed(form))
    }

    /// The confirmed request must still be what the form holds.
    fn ensure_unchanged<F: ConvertedFlow>(
        &self,
        form: &FormHandle<F>,
        req: &F::Request,
        pin_required: bool,
    ) -> Result<(), FlowError> {
        let shared = self.shared_currency();
        let unchanged = form.read(|f| {
            f.request(shared.as_ref(), pin_required)
                .is_ok_and(|now| &now == req)
        });
        if unchanged {
            Ok(())
        } else {
            Err(self.inputs_changed(form))
        }
    }

    fn inputs_changed<F: Flow>(&self, form: &FormHandle<F>) -> FlowError {
        warn!(flow = F::NAME, "Inputs changed after quoting, nothing sent");
        let err = FlowError::from(ValidationError::InputsChanged);
        form.edit(|f| f.status_mut().fail(err.clone()));
        err
    }

    async fn confirm<F: Flow>(
        &self,
        form: &FormHandle<F>,
        confirmer: &dyn Confirmer,
        prompt: &ConfirmPrompt,
    ) -> bool {
        form.edit(|f| f.status_mut().enter(FlowState::Confirming));
        let accepted = confirmer.confirm(prompt).await;
        if !accepted {
            debug!(flow = F::NAME, "Confirmation declined");
            form.edit(|f| f.status_mut().enter(FlowState::Previewed));
        }
        accepted
    }

    /// Classify a failed mutating call and mark the form failed.
    fn reject<F: Flow>(&self, form: &FormHandle<F>, err: ApiError, fallback: &str) -> FlowError {
        let err = self.classify(err, fallback);
        warn!(flow = F::NAME, kind = %err.kind(), error = %err, "Submission failed");
        form.edit(|f| f.status_mut().fail(err.clone()));
        err
    }

    fn classify(&self, err: ApiError, fallback: &str) -> FlowError {
        self.escalate(FlowError::from_api(err, fallback))
    }

    /// Auth failures end the session here, once, before anyone sees them.
    fn escalate(&self, err: FlowError) -> FlowError {
        if err == FlowError::Auth {
            self.lifecycle.force_logout("auth failure during money movement");
        }
        err
    }

    /// Authoritative refetch after a settled mutation.
    ///
    /// The mutation already succeeded, so a failed refetch is logged and the
    /// provisional balance stays up until the next sync.
    async fn reconcile(&self) {
        if let Err(e) = self.sync.refresh().await {
            warn!(kind = %e.kind(), error = %e, "Post-settlement sync failed");
        }
    }
}

fn in_flight<F: Flow>() -> SubmitOutcome {
    debug!(flow = F::NAME, "Submit ignored, request in flight");
    SubmitOutcome::AlreadyInFlight
}
