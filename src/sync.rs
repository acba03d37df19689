//! Profile / transaction sync.
//!
//! [`WalletState`] holds what the wallet screen renders. It changes in
//! exactly two ways: a mutating response overwrites the balance
//! (provisional), and a profile fetch replaces everything (reconciled).
//! The fetch always wins.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::FlowError;
use crate::gateway::WalletApi;
use crate::gateway::types::{Transaction, WalletProfile};
use crate::money::{CurrencyCode, format_balance};
use crate::session::SessionLifecycle;

const PROFILE_FALLBACK: &str = "Could not load your wallet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    /// Taken from a mutating response, awaiting the refetch
    Provisional,
    /// Taken from a full profile fetch
    Reconciled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDisplay {
    pub amount: Decimal,
    pub source: BalanceSource,
}

impl BalanceDisplay {
    pub fn text(&self) -> String {
        format_balance(self.amount)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WalletState {
    profile: Option<WalletProfile>,
    balance: Option<BalanceDisplay>,
}

impl WalletState {
    pub fn profile(&self) -> Option<&WalletProfile> {
        self.profile.as_ref()
    }

    pub fn balance(&self) -> Option<BalanceDisplay> {
        self.balance
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.profile.as_ref().map(|p| &p.wallet_currency)
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.profile
            .as_ref()
            .map(|p| p.transactions.as_slice())
            .unwrap_or(&[])
    }

    /// "9900.00 KES", or just the amount when no profile is loaded
    pub fn balance_line(&self) -> Option<String> {
        let balance = self.balance?;
        Some(match self.currency() {
            Some(currency) => format!("{} {}", balance.text(), currency),
            None => balance.text(),
        })
    }

    fn replace(&mut self, profile: WalletProfile) {
        self.balance = Some(BalanceDisplay {
            amount: profile.wallet_balance,
            source: BalanceSource::Reconciled,
        });
        self.profile = Some(profile);
    }
}

/// Owner of [`WalletState`] and the only component that fetches the profile.
#[derive(Clone)]
pub struct ProfileSync {
    api: Arc<dyn WalletApi>,
    lifecycle: SessionLifecycle,
    state: Arc<RwLock<WalletState>>,
}

impl ProfileSync {
    pub fn new(api: Arc<dyn WalletApi>, lifecycle: SessionLifecycle) -> Self {
        let state = Arc::new(RwLock::new(WalletState::default()));
        let owned = state.clone();
        lifecycle.on_teardown(move || *owned.write() = WalletState::default());
        Self {
            api,
            lifecycle,
            state,
        }
    }

    pub fn snapshot(&self) -> WalletState {
        self.state.read().clone()
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// Refetch the profile and replace local state wholesale.
    ///
    /// An auth failure ends the session and leaves nothing to render.
    pub async fn refresh(&self) -> Result<WalletProfile, FlowError> {
        match self.api.profile().await {
            Ok(profile) => {
                debug!(
                    balance = %profile.wallet_balance,
                    transactions = profile.transactions.len(),
                    "Profile synced"
                );
                self.state.write().replace(profile.clone());
                Ok(profile)
            }
            Err(e) if e.is_auth_failure() => {
                self.lifecycle.force_logout("profile fetch unauthorized");
                Err(FlowError::Auth)
            }
            Err(e) => {
                warn!(error = %e, "Profile sync failed");
                Err(FlowError::from_api(e, PROFILE_FALLBACK))
            }
        }
    }

    /// Overwrite the displayed balance with a server-reported value.
    pub fn apply_provisional(&self, amount: Decimal) {
        self.state.write().balance = Some(BalanceDisplay {
            amount,
            source: BalanceSource::Provisional,
        });
    }

    /// Refresh after `delay` on a background task.
    ///
    /// Used for mobile-money flows where settlement happens out of band.
    pub fn schedule_resync(&self, delay: Duration) -> JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !sync.lifecycle.session().is_active() {
                debug!("Session ended before delayed resync");
                return;
            }
            match sync.refresh().await {
                Ok(_) => info!(delay_secs = delay.as_secs(), "Delayed resync complete"),
                Err(e) => warn!(error = %e, "Delayed resync failed"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{MockWalletApi, profile_json};
    use crate::gateway::{ApiError, Endpoint};
    use crate::navigation::{NavigationLog, Route};
    use crate::session::SessionStore;

    fn setup() -> (Arc<MockWalletApi>, ProfileSync, Arc<NavigationLog>) {
        let session = SessionStore::page_scoped();
        session.set("acc", "ref");
        let nav = Arc::new(NavigationLog::new());
        let mock = Arc::new(MockWalletApi::with_session(session.clone()));
        let sync = ProfileSync::new(mock.clone(), SessionLifecycle::new(session, nav.clone()));
        (mock, sync, nav)
    }

    #[tokio::test]
    async fn test_refresh_replaces_state() {
        let (mock, sync, _nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("10000.00"));

        sync.refresh().await.unwrap();
        let state = sync.snapshot();
        assert_eq!(state.balance_line().as_deref(), Some("10000.00 KES"));
        assert_eq!(state.balance().unwrap().source, BalanceSource::Reconciled);
        assert_eq!(state.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_wins_over_provisional() {
        let (mock, sync, _nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("9850.00"));

        sync.apply_provisional(Decimal::from(9900));
        let shown = sync.snapshot().balance().unwrap();
        assert_eq!(shown.text(), "9900.00");
        assert_eq!(shown.source, BalanceSource::Provisional);

        sync.refresh().await.unwrap();
        let shown = sync.snapshot().balance().unwrap();
        assert_eq!(shown.text(), "9850.00");
        assert_eq!(shown.source, BalanceSource::Reconciled);
    }

    #[tokio::test]
    async fn test_unauthorized_fetch_logs_out_and_clears() {
        let (mock, sync, nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("10.00"));
        sync.refresh().await.unwrap();

        mock.fail(Endpoint::Profile, ApiError::Unauthorized);
        assert_eq!(sync.refresh().await.unwrap_err(), FlowError::Auth);
        assert!(!sync.lifecycle().session().is_active());
        assert_eq!(nav.current(), Some(Route::Login));
        assert!(sync.snapshot().balance().is_none());
        assert!(sync.snapshot().profile().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_drops_wallet_state() {
        use crate::session::InactivityMonitor;

        let (mock, sync, nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("10000.00"));
        sync.refresh().await.unwrap();
        let _monitor =
            InactivityMonitor::arm(sync.lifecycle().clone(), Duration::from_secs(30 * 60))
                .unwrap();

        tokio::time::sleep(Duration::from_secs(30 * 60 + 1)).await;
        assert_eq!(nav.current(), Some(Route::Login));
        let state = sync.snapshot();
        assert!(state.profile().is_none());
        assert!(state.balance().is_none());
        assert!(state.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_state() {
        let (mock, sync, nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("10.00"));
        sync.refresh().await.unwrap();

        mock.fail(Endpoint::Profile, ApiError::Transport("timeout".into()));
        let err = sync.refresh().await.unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert_eq!(sync.snapshot().balance().unwrap().text(), "10.00");
        assert!(nav.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_resync_runs_after_delay() {
        let (mock, sync, _nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("42.00"));

        let task = sync.schedule_resync(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(mock.call_count(Endpoint::Profile), 0);

        task.await.unwrap();
        assert_eq!(mock.call_count(Endpoint::Profile), 1);
        assert_eq!(sync.snapshot().balance().unwrap().text(), "42.00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_resync_skipped_after_logout() {
        let (mock, sync, _nav) = setup();
        mock.respond(Endpoint::Profile, profile_json("42.00"));

        let task = sync.schedule_resync(Duration::from_secs(5));
        sync.lifecycle().session().clear();
        task.await.unwrap();
        assert_eq!(mock.call_count(Endpoint::Profile), 0);
    }
}
