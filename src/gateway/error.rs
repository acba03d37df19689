use serde_json::Value;
use thiserror::Error;

/// Raw outcome of a failed gateway call, before flow classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Bearer route called with no credential in the session; nothing was sent
    #[error("No session credential for an authenticated endpoint")]
    MissingCredential,

    /// Server answered 401
    #[error("Credential rejected by server")]
    Unauthorized,

    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    #[inline]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::MissingCredential | ApiError::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// Pull the human-readable reason out of an error body.
///
/// The backend uses `error` for business rejections, `message` on some
/// registration paths and `detail` for framework-level errors. Field
/// validation errors arrive as `{"field": ["reason", ...]}`.
pub fn server_message(body: &Value) -> Option<String> {
    for key in ["error", "message", "detail"] {
        if let Some(text) = body.get(key).and_then(first_text) {
            return Some(text);
        }
    }

    body.as_object()?.iter().find_map(|(field, value)| {
        first_text(value).map(|text| {
            if field == "non_field_errors" {
                text
            } else {
                format!("{}: {}", field, text)
            }
        })
    })
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_precedence() {
        assert_eq!(
            server_message(&json!({"error": "Insufficient balance", "message": "x"})).as_deref(),
            Some("Insufficient balance")
        );
        assert_eq!(
            server_message(&json!({"message": "Username already exists."})).as_deref(),
            Some("Username already exists.")
        );
        assert_eq!(
            server_message(&json!({"detail": "Given token not valid"})).as_deref(),
            Some("Given token not valid")
        );
    }

    #[test]
    fn test_server_message_field_errors() {
        assert_eq!(
            server_message(&json!({"amount": ["A valid number is required."]})).as_deref(),
            Some("amount: A valid number is required.")
        );
        assert_eq!(
            server_message(&json!({"non_field_errors": ["Invalid PIN"]})).as_deref(),
            Some("Invalid PIN")
        );
    }

    #[test]
    fn test_server_message_absent() {
        assert_eq!(server_message(&json!({})), None);
        assert_eq!(server_message(&json!({"error": ""})), None);
        assert_eq!(server_message(&json!("plain")), None);
    }

    #[test]
    fn test_auth_failures() {
        assert!(ApiError::Unauthorized.is_auth_failure());
        assert!(ApiError::MissingCredential.is_auth_failure());
        assert!(!ApiError::Transport("x".into()).is_auth_failure());
        let rejected = ApiError::Rejected {
            status: 400,
            message: None,
        };
        assert_eq!(rejected.to_string(), "Request rejected (400): no message");
    }
}
