//! Amount and currency handling.
//!
//! All user-entered amounts go through [`parse_amount`] before any request is
//! built, and all balances shown to the user go through [`format_balance`].
//! Amounts travel as `rust_decimal::Decimal`, never as floats.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Parse a user-entered amount.
///
/// Rejects empty input, anything that is not a plain decimal number
/// (no exponent, no digit separators), and values `<= 0`.
///
/// ```
/// use wallet_client::money::parse_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_amount(" 100 ").unwrap(), Decimal::from(100));
/// assert!(parse_amount("0").is_err());
/// assert!(parse_amount("abc").is_err());
/// ```
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::EmptyAmount);
    }

    let unsigned = input.strip_prefix(['-', '+']).unwrap_or(input);
    if unsigned.is_empty()
        || unsigned.chars().filter(|c| *c == '.').count() > 1
        || !unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        || !unsigned.chars().any(|c| c.is_ascii_digit())
    {
        return Err(ValidationError::NonNumericAmount);
    }

    let amount = Decimal::from_str(input).map_err(|_| ValidationError::NonNumericAmount)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }

    Ok(amount.normalize())
}

/// Render a balance with exactly two decimal places.
pub fn format_balance(balance: Decimal) -> String {
    let mut rounded = balance.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// ISO 4217 currency code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::MissingCurrency);
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_amounts() {
        assert_eq!(parse_amount("100").unwrap(), Decimal::from(100));
        assert_eq!(parse_amount("0.5").unwrap(), Decimal::new(5, 1));
        assert_eq!(parse_amount("100.50").unwrap(), Decimal::new(1005, 1));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(parse_amount(""), Err(ValidationError::EmptyAmount));
        assert_eq!(parse_amount("   "), Err(ValidationError::EmptyAmount));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        for input in ["abc", "12a", "1e5", "1_000", "1.2.3", ".", "-", "1,000", "NaN"] {
            assert_eq!(
                parse_amount(input),
                Err(ValidationError::NonNumericAmount),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        for input in ["0", "0.00", "-1", "-0.01"] {
            assert_eq!(
                parse_amount(input),
                Err(ValidationError::NonPositiveAmount),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(Decimal::from(9900)), "9900.00");
        assert_eq!(format_balance(Decimal::new(12345, 3)), "12.35");
        assert_eq!(format_balance(Decimal::new(5, 1)), "0.50");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::parse("usd").unwrap().as_str(), "USD");
        assert_eq!(CurrencyCode::parse(""), Err(ValidationError::MissingCurrency));
        assert!(matches!(
            CurrencyCode::parse("US"),
            Err(ValidationError::InvalidCurrency(_))
        ));
        assert!(CurrencyCode::parse("U$D").is_err());

        let json = serde_json::to_string(&CurrencyCode::parse("kes").unwrap()).unwrap();
        assert_eq!(json, "\"KES\"");
        let back: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(back.as_str(), "GBP");
    }
}
