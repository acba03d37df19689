//! Login, logout, idle timeout and expired-token handling end to end.

mod common;

use common::{FakeBackend, Wallet, profile};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use wallet_client::config::FlowConfig;
use wallet_client::{
    ActivitySignal, ErrorKind, InactivityMonitor, NavigationLog, RegisterForm, Route,
    SessionLifecycle, SessionStore,
};

const IDLE: Duration = Duration::from_secs(30 * 60);

#[tokio::test]
async fn test_login_then_otp_stores_credential() {
    let backend = FakeBackend::start().await;
    backend.reply("login/", 200, json!({"user_id": "u-42"}));
    backend.reply(
        "verify-otp/",
        200,
        json!({"access_token": "tok-a", "refresh_token": "tok-r"}),
    );
    let wallet = Wallet::connect(&backend, FlowConfig::default());

    let message = wallet.auth.login("alice@example.com", "pw").await.unwrap();
    assert_eq!(message, "OTP sent to your email. Please verify.");
    assert_eq!(wallet.session.login_challenge().as_deref(), Some("u-42"));
    assert!(!wallet.session.is_active());

    let message = wallet.auth.verify_otp(" 123456 ").await.unwrap();
    assert_eq!(message, "OTP verified successfully! Redirecting...");
    let credential = wallet.session.get().unwrap();
    assert_eq!(credential.access_token, "tok-a");
    assert_eq!(credential.refresh_token, "tok-r");
    assert_eq!(wallet.session.login_challenge(), None);
    assert_eq!(wallet.nav.history(), vec![Route::VerifyOtp, Route::Wallet]);

    assert_eq!(backend.last("verify-otp/").unwrap().body["user_id"], "u-42");
}

#[tokio::test]
async fn test_login_rejection_shows_server_reason() {
    let backend = FakeBackend::start().await;
    backend.reply("login/", 400, json!({"error": "Invalid credentials"}));
    let wallet = Wallet::connect(&backend, FlowConfig::default());

    let err = wallet.auth.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Business);
    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(wallet.session.login_challenge(), None);
    assert!(wallet.nav.history().is_empty());

    // 401 on a public endpoint is a rejection, not a session expiry
    backend.reply("login/", 401, json!({}));
    let err = wallet.auth.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.user_message(), "Login failed.");
}

#[tokio::test]
async fn test_wrong_otp_keeps_challenge() {
    let backend = FakeBackend::start().await;
    backend.reply("login/", 200, json!({"user_id": 7}));
    backend.reply("verify-otp/", 400, json!({}));
    let wallet = Wallet::connect(&backend, FlowConfig::default());

    wallet.auth.login("alice", "pw").await.unwrap();
    let err = wallet.auth.verify_otp("000000").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid OTP.");
    assert!(!wallet.session.is_active());
    assert_eq!(wallet.session.login_challenge().as_deref(), Some("7"));
}

#[tokio::test]
async fn test_otp_without_login_sends_nothing() {
    let backend = FakeBackend::start().await;
    let wallet = Wallet::connect(&backend, FlowConfig::default());

    let err = wallet.auth.verify_otp("123456").await.unwrap_err();
    assert_eq!(err.user_message(), "User ID not found. Please log in again.");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_expired_token_on_profile_logs_out() {
    let backend = FakeBackend::start().await;
    backend.reply(
        "user/profile/",
        401,
        json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}),
    );
    let wallet = Wallet::connect(&backend, FlowConfig::default());
    wallet.session.set("stale", "stale-r");

    let err = wallet.sync().refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!wallet.session.is_active());
    assert_eq!(wallet.nav.current(), Some(Route::Login));
    let state = wallet.sync().snapshot();
    assert!(state.balance().is_none());
    assert!(state.transactions().is_empty());

    // Later bearer calls fail fast without touching the network
    let before = backend.calls().len();
    assert_eq!(
        wallet.sync().refresh().await.unwrap_err().kind(),
        ErrorKind::Auth
    );
    assert_eq!(backend.calls().len(), before);
}

#[tokio::test]
async fn test_forbidden_token_not_valid_is_auth_failure() {
    let backend = FakeBackend::start().await;
    backend.reply(
        "user/profile/",
        403,
        json!({"detail": "Given token not valid", "code": "token_not_valid"}),
    );
    let wallet = Wallet::connect(&backend, FlowConfig::default());
    wallet.session.set("stale", "stale-r");

    let err = wallet.sync().refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!wallet.session.is_active());
}

#[tokio::test]
async fn test_logout_clears_session_and_wallet() {
    let backend = FakeBackend::start().await;
    backend.reply("user/profile/", 200, profile("10.00"));
    let wallet = Wallet::connect(&backend, FlowConfig::default());
    wallet.session.set("tok", "ref");
    wallet.sync().refresh().await.unwrap();

    wallet.auth.logout();

    assert!(!wallet.session.is_active());
    assert!(wallet.sync().snapshot().profile().is_none());
    assert_eq!(wallet.nav.current(), Some(Route::Login));
}

#[tokio::test]
async fn test_register_and_currency_fallback() {
    let backend = FakeBackend::start().await;
    backend.reply("register/", 201, json!({"username": "alice"}));
    let wallet = Wallet::connect(&backend, FlowConfig::default());

    let form = RegisterForm {
        first_name: "Alice".into(),
        last_name: "Doe".into(),
        username: "alice".into(),
        email: Some("alice@example.com".into()),
        mobile: "0712345678".into(),
        password: "secret".into(),
        confirm_password: "secret".into(),
        currency: "kes".into(),
        ..Default::default()
    };
    let message = wallet.auth.register(&form).await.unwrap();
    assert_eq!(message, "Account created successfully!");
    let sent = backend.last("register/").unwrap();
    assert_eq!(sent.body["currency"], "KES");
    assert_eq!(sent.authorization, None);

    let mismatch = RegisterForm {
        confirm_password: "other".into(),
        ..form
    };
    let err = wallet.auth.register(&mismatch).await.unwrap_err();
    assert_eq!(err.user_message(), "Passwords do not match!");
    assert_eq!(backend.count("register/"), 1);

    // No catalogue route scripted: the shell still offers KES
    let currencies = wallet.auth.currencies().await;
    assert_eq!(currencies.len(), 1);
    assert_eq!(currencies[0].code, "KES");
    assert_eq!(currencies[0].name, "Kenyan Shilling");
}

#[tokio::test(start_paused = true)]
async fn test_idle_thirty_minutes_returns_to_login() {
    let session = SessionStore::page_scoped();
    session.set("tok", "ref");
    let nav = Arc::new(NavigationLog::new());
    let lifecycle = SessionLifecycle::new(session.clone(), nav.clone());
    let monitor = InactivityMonitor::arm(lifecycle, IDLE).unwrap();

    // Activity at minute 20 pushes the deadline to minute 50
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    monitor.notify(ActivitySignal::PointerMove);
    tokio::time::sleep(Duration::from_secs(25 * 60)).await;
    assert!(session.is_active());

    tokio::time::sleep(Duration::from_secs(6 * 60)).await;
    assert!(!session.is_active());
    assert_eq!(nav.history(), vec![Route::Login]);

    // A later timeout with no session does not redirect again
    tokio::time::sleep(IDLE + Duration::from_secs(60)).await;
    assert_eq!(nav.history(), vec![Route::Login]);
}

#[tokio::test(start_paused = true)]
async fn test_page_unload_clears_without_redirect() {
    let session = SessionStore::page_scoped();
    session.set("tok", "ref");
    let nav = Arc::new(NavigationLog::new());
    let monitor =
        InactivityMonitor::arm(SessionLifecycle::new(session.clone(), nav.clone()), IDLE).unwrap();

    assert!(monitor.notify(ActivitySignal::BeforeUnload));
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(!session.is_active());
    assert!(nav.history().is_empty());
}
