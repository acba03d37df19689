//! Transaction PIN input handling.

use std::fmt;

use crate::error::ValidationError;

pub const PIN_LENGTH: usize = 6;

/// Input-time coercion: keep ASCII digits only, at most [`PIN_LENGTH`] of them.
///
/// Applied on every keystroke so the field can never hold anything else.
pub fn coerce_pin(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(PIN_LENGTH)
        .collect()
}

/// A PIN that passed submission validation: exactly six digits.
///
/// `Debug` is redacted so a PIN never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Validate an already-coerced field value.
    pub fn from_field(field: &str) -> Result<Self, ValidationError> {
        if field.len() != PIN_LENGTH || !field.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::PinRequired);
        }
        Ok(Self(field.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(******)")
    }
}

/// Resolve the PIN for a submission under the flow's policy.
///
/// Returns `None` when the flow is not PIN-gated and nothing was typed.
/// A non-empty field is still validated so a half-typed PIN is never sent.
pub fn require_pin(field: &str, required: bool) -> Result<Option<Pin>, ValidationError> {
    if !required && field.is_empty() {
        return Ok(None);
    }
    Pin::from_field(field).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_strips_non_digits() {
        assert_eq!(coerce_pin("12a45"), "1245");
        assert_eq!(coerce_pin(" 1-2 3 "), "123");
        assert_eq!(coerce_pin("abc"), "");
    }

    #[test]
    fn test_coerce_truncates() {
        assert_eq!(coerce_pin("1234567890"), "123456");
        assert_eq!(coerce_pin("１２３"), ""); // full-width digits are not ASCII
    }

    #[test]
    fn test_coerced_output_is_always_short_digits() {
        for raw in ["", "0", "999999999", "a1b2c3d4e5f6g7", "٣٤٥", "12 34 56 78"] {
            let pin = coerce_pin(raw);
            assert!(pin.len() <= PIN_LENGTH);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_submission_requires_exactly_six() {
        assert_eq!(
            Pin::from_field(&coerce_pin("12a45")),
            Err(ValidationError::PinRequired)
        );
        assert!(Pin::from_field("123456").is_ok());
        assert!(Pin::from_field("").is_err());
    }

    #[test]
    fn test_require_pin_policy() {
        assert_eq!(require_pin("", false), Ok(None));
        assert!(require_pin("", true).is_err());
        assert!(require_pin("123", false).is_err());
        assert_eq!(
            require_pin("654321", true).unwrap().unwrap().expose(),
            "654321"
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let pin = Pin::from_field("123456").unwrap();
        assert!(!format!("{:?}", pin).contains("123456"));
    }
}
