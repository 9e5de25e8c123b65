//! Cooperative cancellation for blocking waits

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    canceled: Mutex<bool>,
    signal: Condvar,
}

/// Cloneable handle that stops a wait from another thread.
///
/// Sleeping through [`CancelToken::sleep`] wakes as soon as
/// [`CancelToken::cancel`] is called.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut canceled = self
            .inner
            .canceled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *canceled = true;
        self.inner.signal.notify_all();
    }

    pub fn is_canceled(&self) -> bool {
        *self
            .inner
            .canceled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless canceled first.
    ///
    /// Returns `true` if the token was canceled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut canceled = self
            .inner
            .canceled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while !*canceled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            canceled = self
                .inner
                .signal
                .wait_timeout(canceled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_sleep_runs_full_duration() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(token.is_canceled());
        handle.join().unwrap();
    }

    #[test]
    fn test_already_canceled_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.sleep(Duration::from_secs(30)));
    }
}
