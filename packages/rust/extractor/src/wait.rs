//! Bounded waits used while the host page settles.
//!
//! The host page gives no completion signal after a reveal click, so the
//! extractor sleeps for a fixed dwell. This is a heuristic, not a guarantee.

use std::future::Future;
use std::time::Duration;

use studiosync_shared::ExtractorConfig;

/// Timing knobs for page interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dwell {
    /// Fixed pause after every click on a reveal control.
    pub after_click: Duration,
    /// Upper bound for [`wait_until`] before extraction starts.
    pub ready_timeout: Duration,
    /// Poll interval for [`wait_until`].
    pub poll_interval: Duration,
}

impl Dwell {
    /// No pauses at all (snapshots and tests).
    pub fn none() -> Self {
        Self {
            after_click: Duration::ZERO,
            ready_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }

    /// Let the page finish its own state transition after a click.
    pub async fn settle(&self) {
        if !self.after_click.is_zero() {
            tokio::time::sleep(self.after_click).await;
        }
    }
}

impl From<&ExtractorConfig> for Dwell {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            after_click: Duration::from_millis(config.click_dwell_ms),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Poll `check` until it returns `true` or `timeout` elapses.
///
/// Always checks at least once. Returns whether the predicate was satisfied.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let interval = interval.max(Duration::from_millis(1));

    loop {
        if check().await {
            return true;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn wait_until_returns_once_satisfied() {
        let calls = AtomicUsize::new(0);
        let ok = wait_until(Duration::from_secs(2), Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { n >= 2 }
        })
        .await;
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_until_gives_up_after_timeout() {
        let ok = wait_until(Duration::from_millis(20), Duration::from_millis(5), || async {
            false
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn zero_timeout_checks_once() {
        let calls = AtomicUsize::new(0);
        let ok = wait_until(Duration::ZERO, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { false }
        })
        .await;
        assert!(!ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dwell_from_config() {
        let dwell = Dwell::from(&ExtractorConfig::default());
        assert_eq!(dwell.after_click, Duration::from_millis(500));
        assert_eq!(dwell.ready_timeout, Duration::from_secs(10));
    }
}
