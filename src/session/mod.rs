//! Session lifecycle
//!
//! - [`store`] - credential pair over page-scoped storage
//! - [`lifecycle`] - forced logout (clear + redirect)
//! - [`activity`] - inactivity monitor

pub mod activity;
pub mod lifecycle;
pub mod storage;
pub mod store;

pub use activity::{ActivityHandle, ActivitySignal, InactivityMonitor, MonitorError};
pub use lifecycle::SessionLifecycle;
pub use storage::{KeyValueStorage, PageStorage};
pub use store::{Credential, SessionContext, SessionStore};
