//! Inactivity monitor.
//!
//! One state (`armed`) with a rolling deadline:
//!
//! ```text
//!   PointerMove / KeyPress ──► deadline = now + idle_timeout
//!   deadline reached        ──► clear session, navigate to login
//!   PageHidden / BeforeUnload ► clear session immediately
//! ```
//!
//! The watcher task and the signal channel are owned by [`InactivityMonitor`];
//! dropping it aborts the task and disconnects every [`ActivityHandle`].

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::lifecycle::SessionLifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    PointerMove,
    KeyPress,
    /// `visibilitychange` to hidden
    PageHidden,
    /// `visibilitychange` to visible
    PageVisible,
    /// `beforeunload`
    BeforeUnload,
}

impl ActivitySignal {
    #[inline]
    pub fn resets_deadline(&self) -> bool {
        matches!(self, ActivitySignal::PointerMove | ActivitySignal::KeyPress)
    }

    #[inline]
    pub fn tears_down(&self) -> bool {
        matches!(self, ActivitySignal::PageHidden | ActivitySignal::BeforeUnload)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Inactivity monitor requires a running tokio runtime")]
    NoRuntime,

    #[error("Idle timeout must be greater than zero")]
    ZeroTimeout,
}

/// Cheap, cloneable listener endpoint handed to whatever produces UI events.
#[derive(Clone)]
pub struct ActivityHandle {
    tx: mpsc::UnboundedSender<ActivitySignal>,
}

impl ActivityHandle {
    /// Returns `false` once the monitor has been torn down.
    pub fn notify(&self, signal: ActivitySignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

pub struct InactivityMonitor {
    handle: ActivityHandle,
    task: JoinHandle<()>,
}

impl InactivityMonitor {
    /// Register listeners and start the deadline.
    ///
    /// Must be called from inside a tokio runtime. Nothing is spawned when
    /// this returns an error.
    pub fn arm(lifecycle: SessionLifecycle, idle_timeout: Duration) -> Result<Self, MonitorError> {
        if idle_timeout.is_zero() {
            return Err(MonitorError::ZeroTimeout);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(watch(lifecycle, idle_timeout, rx));
        debug!(idle_secs = idle_timeout.as_secs(), "Inactivity monitor armed");

        Ok(Self {
            handle: ActivityHandle { tx },
            task,
        })
    }

    pub fn handle(&self) -> ActivityHandle {
        self.handle.clone()
    }

    pub fn notify(&self, signal: ActivitySignal) -> bool {
        self.handle.notify(signal)
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
        debug!("Inactivity monitor released");
    }
}

async fn watch(
    lifecycle: SessionLifecycle,
    idle_timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<ActivitySignal>,
) {
    let deadline = sleep(idle_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                if lifecycle.session().is_active() {
                    info!(idle_secs = idle_timeout.as_secs(), "Session idle timeout reached");
                    lifecycle.force_logout("inactivity");
                }
                deadline.as_mut().reset(Instant::now() + idle_timeout);
            }
            signal = rx.recv() => match signal {
                Some(s) if s.resets_deadline() => {
                    deadline.as_mut().reset(Instant::now() + idle_timeout);
                }
                Some(s) if s.tears_down() => {
                    debug!(signal = ?s, "Page teardown, clearing session");
                    lifecycle.end_session();
                }
                Some(_) => {}
                None => break,
            },
        }
    }
}
