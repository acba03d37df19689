use parking_lot::RwLock;
use std::sync::Arc;

use super::store::SessionContext;
use crate::navigation::{Navigator, Route};

type TeardownHook = Box<dyn Fn() + Send + Sync>;

/// The writes to the session that end it: logout, inactivity, auth failure.
///
/// Components holding per-user state register a teardown hook; it runs on
/// every path that ends the session.
#[derive(Clone)]
pub struct SessionLifecycle {
    session: SessionContext,
    navigator: Arc<dyn Navigator>,
    hooks: Arc<RwLock<Vec<TeardownHook>>>,
}

impl SessionLifecycle {
    pub fn new(session: SessionContext, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            hooks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Run `hook` whenever the session ends.
    pub fn on_teardown(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.write().push(Box::new(hook));
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Clear the credential and send the user back to login.
    pub fn force_logout(&self, reason: &'static str) {
        tracing::info!(reason, "Forcing logout");
        self.end_session();
        self.navigator.navigate(Route::Login);
    }

    /// Clear the credential and every registered per-user state, no redirect.
    pub fn end_session(&self) {
        self.session.clear();
        for hook in self.hooks.read().iter() {
            hook();
        }
    }
}
