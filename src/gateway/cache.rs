//! TTL cache for the currency catalogue.
//!
//! The catalogue only changes on backend deploys, so every registration
//! screen within the TTL reuses one `currencies/` call. Errors are not
//! cached: the next call retries.

use cached::proc_macro::cached;
use std::sync::Arc;

use super::types::CurrencyInfo;
use super::{ApiError, WalletApi};

/// TTL for the currency catalogue in seconds
pub const CURRENCIES_TTL_SECONDS: u64 = 300;

/// Load the supported currencies, cached per backend origin.
#[cached(
    time = 300,
    key = "String",
    convert = r#"{ api.origin() }"#,
    result = true
)]
pub async fn load_currencies_cached(
    api: Arc<dyn WalletApi>,
) -> Result<Vec<CurrencyInfo>, ApiError> {
    tracing::debug!("[cache] Loading currency catalogue");
    Ok(api.currencies().await?.currencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoint;
    use crate::gateway::mock::MockWalletApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_catalogue_fetched_once_within_ttl() {
        let mock = Arc::new(MockWalletApi::new());
        mock.respond(
            Endpoint::Currencies,
            json!({"currencies": [{"code": "KES", "name": "Kenyan Shilling"}, {"code": "USD", "name": "US Dollar"}]}),
        );
        let api: Arc<dyn WalletApi> = mock.clone();

        let first = load_currencies_cached(api.clone()).await.unwrap();
        let second = load_currencies_cached(api).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(mock.call_count(Endpoint::Currencies), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mock = Arc::new(MockWalletApi::new());
        mock.fail(Endpoint::Currencies, ApiError::Transport("down".into()));
        let api: Arc<dyn WalletApi> = mock.clone();

        assert!(load_currencies_cached(api.clone()).await.is_err());
        mock.respond(Endpoint::Currencies, json!({"currencies": [{"code": "USD", "name": "US Dollar"}]}));
        let list = load_currencies_cached(api).await.unwrap();
        assert_eq!(list[0].code, "USD");
        assert_eq!(mock.call_count(Endpoint::Currencies), 2);
    }

    #[test]
    fn test_ttl_constant() {
        assert_eq!(CURRENCIES_TTL_SECONDS, 300);
    }
}
