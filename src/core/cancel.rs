//! Scan cancellation.
//!
//! A [`CancelSignal`] combines an optional deadline with an explicit cancel
//! flag. Every in-flight check races its probe against the signal, so an
//! expired deadline resolves the check to an `error` result instead of
//! hanging the scan.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Observes cancellation of a scan. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    deadline: Option<Instant>,
    flag: watch::Receiver<bool>,
}

/// Triggers cancellation of every [`CancelSignal`] created with it.
#[derive(Debug)]
pub struct CancelHandle {
    flag: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels the scan.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Returns `true` if `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }
}

impl CancelSignal {
    /// Creates a signal that never fires.
    pub fn never() -> Self {
        let (_, flag) = watch::channel(false);
        Self {
            deadline: None,
            flag,
        }
    }

    /// Creates a linked handle/signal pair without a deadline.
    pub fn pair() -> (CancelHandle, Self) {
        let (tx, flag) = watch::channel(false);
        (
            CancelHandle { flag: tx },
            Self {
                deadline: None,
                flag,
            },
        )
    }

    /// Creates a signal that fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::never().and_deadline(deadline)
    }

    /// Creates a signal that fires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Adds (or tightens) a deadline on this signal.
    pub fn and_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if the scan has been cancelled or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if *self.flag.borrow() {
            return true;
        }
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Completes once the scan is cancelled. Pends forever if it never is.
    pub async fn cancelled(&self) {
        let mut flag = self.flag.clone();
        let flagged = async move {
            // A dropped handle can no longer cancel.
            if flag.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {}
                    _ = flagged => {}
                }
            }
            None => flagged.await,
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_deadline_is_cancelled() {
        let signal = CancelSignal::with_deadline(Instant::now());
        assert!(signal.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("expired deadline resolves immediately");
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_handle_cancels_signal() {
        let (handle, signal) = CancelSignal::pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancel wakes waiters")
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_and_deadline_keeps_earliest() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let now = Instant::now();
            let signal = CancelSignal::with_deadline(now + Duration::from_secs(5))
                .and_deadline(now + Duration::from_secs(1));
            assert_eq!(signal.deadline(), Some(now + Duration::from_secs(1)));
        });
    }
}
