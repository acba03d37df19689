//! Conversion preview.
//!
//! A quote is a read-only answer to "what would `amount` be in
//! `currency_to`?". It commits nothing and is only meaningful for the exact
//! pair it was fetched for.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::error::{FlowError, ValidationError};
use crate::gateway::WalletApi;
use crate::gateway::types::PreviewRequest;
use crate::money::{CurrencyCode, format_balance};

const PREVIEW_FALLBACK: &str = "Could not fetch a conversion preview.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionQuote {
    pub amount: Decimal,
    pub converted_amount: Decimal,
    pub rate: Decimal,
    pub currency_to: CurrencyCode,
}

impl ConversionQuote {
    /// True only for the exact inputs the quote was fetched for.
    pub fn matches(&self, amount: Decimal, currency_to: &CurrencyCode) -> bool {
        self.amount == amount && &self.currency_to == currency_to
    }

    /// One-line summary for confirmation prompts
    pub fn describe(&self) -> String {
        format!(
            "{} will be converted to {} {} at rate {}",
            format_balance(self.amount),
            self.converted_amount,
            self.currency_to,
            self.rate
        )
    }
}

#[derive(Clone)]
pub struct PreviewService {
    api: Arc<dyn WalletApi>,
}

impl PreviewService {
    pub fn new(api: Arc<dyn WalletApi>) -> Self {
        Self { api }
    }

    /// Fetch a fresh quote. Non-positive amounts never reach the network.
    pub async fn preview(
        &self,
        amount: Decimal,
        currency_to: &CurrencyCode,
    ) -> Result<ConversionQuote, FlowError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount.into());
        }

        let req = PreviewRequest {
            amount,
            currency_to: currency_to.clone(),
        };
        let resp = self
            .api
            .convert_preview(&req)
            .await
            .map_err(|e| FlowError::from_api(e, PREVIEW_FALLBACK))?;

        debug!(%amount, currency_to = %currency_to, rate = %resp.rate, "Conversion quote");
        Ok(ConversionQuote {
            amount,
            converted_amount: resp.converted_amount,
            rate: resp.rate,
            currency_to: currency_to.clone(),
        })
    }

    /// Reuse `cached` when it still matches the inputs, otherwise re-fetch.
    pub async fn quote_for(
        &self,
        cached: Option<&ConversionQuote>,
        amount: Decimal,
        currency_to: &CurrencyCode,
    ) -> Result<ConversionQuote, FlowError> {
        match cached {
            Some(quote) if quote.matches(amount, currency_to) => Ok(quote.clone()),
            _ => self.preview(amount, currency_to).await,
        }
    }
}
