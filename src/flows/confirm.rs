//! Explicit confirmation before a converted money movement.

use async_trait::async_trait;

use crate::money::{CurrencyCode, format_balance};
use crate::preview::ConversionQuote;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    /// "Send" / "Withdraw"
    pub action: &'static str,
    /// Recipient username/email or receiver email
    pub counterparty: String,
    /// Wallet currency the amount is debited in, when the profile is loaded
    pub source_currency: Option<CurrencyCode>,
    pub quote: ConversionQuote,
}

impl ConfirmPrompt {
    pub fn message(&self) -> String {
        let debited = match &self.source_currency {
            Some(code) => format!("{} {}", format_balance(self.quote.amount), code),
            None => format_balance(self.quote.amount),
        };
        format!(
            "{} {} to {}? They will receive {} {} (rate {}).",
            self.action,
            debited,
            self.counterparty,
            self.quote.converted_amount,
            self.quote.currency_to,
            self.quote.rate
        )
    }
}

/// Whatever asks the user. Only `true` lets the mutating call through.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Fixed answer, for scripted hosts and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        tracing::debug!(prompt = %prompt.message(), answer = self.0, "Auto confirm");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn prompt(source_currency: Option<&str>) -> ConfirmPrompt {
        ConfirmPrompt {
            action: "Send",
            counterparty: "bob".into(),
            source_currency: source_currency.map(|c| CurrencyCode::parse(c).unwrap()),
            quote: ConversionQuote {
                amount: Decimal::from(100),
                converted_amount: Decimal::from_str("0.77").unwrap(),
                rate: Decimal::from_str("0.0077").unwrap(),
                currency_to: CurrencyCode::parse("USD").unwrap(),
            },
        }
    }

    #[test]
    fn test_prompt_names_both_currencies() {
        assert_eq!(
            prompt(Some("KES")).message(),
            "Send 100.00 KES to bob? They will receive 0.77 USD (rate 0.0077)."
        );
    }

    #[test]
    fn test_prompt_without_profile_omits_source_currency() {
        assert_eq!(
            prompt(None).message(),
            "Send 100.00 to bob? They will receive 0.77 USD (rate 0.0077)."
        );
    }
}
