//! Per-form processing flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// At most one submission per form at a time.
///
/// `try_acquire` is checked on entry, before any await. The returned permit
/// clears the flag when dropped, on every exit path including panics and
/// cancelled futures.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct SubmitPermit {
    busy: Arc<AtomicBool>,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<SubmitPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let guard = SubmitGuard::new();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = SubmitGuard::new();
        let g = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = g.try_acquire().unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!guard.is_busy());
    }
}
