use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::storage::{KeyValueStorage, PageStorage};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Opaque user reference returned by `login/`, consumed by `verify-otp/`
pub const LOGIN_CHALLENGE_KEY: &str = "user_id";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Sole owner of the credential pair.
///
/// Writers: OTP verification (`set`), logout / inactivity / auth failure
/// (`clear`). Everyone else only reads.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    // Keeps the two token keys consistent with each other
    lock: RwLock<()>,
}

/// Shared handle passed explicitly to every component that needs the session
pub type SessionContext = Arc<SessionStore>;

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            lock: RwLock::new(()),
        }
    }

    /// Store backed by fresh page storage, wrapped for sharing
    pub fn page_scoped() -> SessionContext {
        Arc::new(Self::new(Arc::new(PageStorage::new())))
    }

    pub fn set(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        let _guard = self.lock.write();
        self.storage.set(ACCESS_TOKEN_KEY, access_token.into());
        self.storage.set(REFRESH_TOKEN_KEY, refresh_token.into());
        tracing::info!("Session credential stored");
    }

    pub fn get(&self) -> Option<Credential> {
        let _guard = self.lock.read();
        let access_token = self.storage.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.storage.get(REFRESH_TOKEN_KEY).unwrap_or_default();
        Some(Credential {
            access_token,
            refresh_token,
        })
    }

    pub fn is_active(&self) -> bool {
        self.get().is_some()
    }

    /// Drop the credential. Idempotent and safe with no active session.
    ///
    /// A pending login challenge survives: hiding the page to read the OTP
    /// must not void the login in progress.
    pub fn clear(&self) {
        let _guard = self.lock.write();
        let was_active = self.storage.get(ACCESS_TOKEN_KEY).is_some();
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        if was_active {
            tracing::info!("Session cleared");
        }
    }

    pub fn set_login_challenge(&self, user_ref: impl Into<String>) {
        self.storage.set(LOGIN_CHALLENGE_KEY, user_ref.into());
    }

    pub fn login_challenge(&self) -> Option<String> {
        self.storage.get(LOGIN_CHALLENGE_KEY)
    }

    pub fn take_login_challenge(&self) -> Option<String> {
        let challenge = self.storage.get(LOGIN_CHALLENGE_KEY);
        self.storage.remove(LOGIN_CHALLENGE_KEY);
        challenge
    }
}
