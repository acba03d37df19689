//! Navigation seam.
//!
//! The core never renders anything; it only tells the host which screen to
//! show next. Hosts implement [`Navigator`] (the CLI prints a banner, a
//! browser host would push a route).

use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Register,
    Login,
    VerifyOtp,
    Wallet,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Register => "/register",
            Route::Login => "/login",
            Route::VerifyOtp => "/verify-otp",
            Route::Wallet => "/wallet",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only records where it was sent.
#[derive(Default)]
pub struct NavigationLog {
    routes: Mutex<Vec<Route>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Route> {
        self.routes.lock().last().copied()
    }

    pub fn history(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "navigate");
        self.routes.lock().push(route);
    }
}
