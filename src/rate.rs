use std::future::Future;
use std::time::Duration;

use log::{info, warn};

use crate::error::FetchError;
use crate::http::RestClient;
use crate::types::Quota;

/// Below this many remaining calls the governor waits for the reset.
pub const DEFAULT_SAFETY_MARGIN: i64 = 10;
/// Longest single wait before proceeding regardless.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Anything that can report the caller's current quota.
pub trait QuotaSource {
    fn quota(&self) -> impl Future<Output = Result<Quota, FetchError>> + Send;
}

impl QuotaSource for RestClient {
    async fn quota(&self) -> Result<Quota, FetchError> {
        self.rate_limit().await
    }
}

/// Pauses list operations while the remote quota is nearly spent.
#[derive(Debug, Clone, Copy)]
pub struct RateGovernor {
    safety_margin: i64,
    max_wait: Duration,
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_MARGIN, DEFAULT_MAX_WAIT)
    }
}

impl RateGovernor {
    pub fn new(safety_margin: i64, max_wait: Duration) -> Self {
        Self {
            safety_margin,
            max_wait,
        }
    }

    /// How long to wait given `quota` at epoch second `now`; `None` means go.
    pub fn wait_for(&self, quota: &Quota, now: i64) -> Option<Duration> {
        if quota.remaining >= self.safety_margin {
            return None;
        }
        let until_reset = quota.reset - now;
        if until_reset <= 0 {
            return None;
        }
        let wait = Duration::from_secs(until_reset as u64 + 1);
        Some(wait.min(self.max_wait))
    }

    /// Check the quota once and sleep if it is low.
    ///
    /// Best effort: a failed check is logged and the caller proceeds. The
    /// sleep suspends only the calling task. Returns the time waited.
    pub async fn ensure_quota<Q: QuotaSource>(&self, source: &Q) -> Duration {
        let quota = match source.quota().await {
            Ok(q) => q,
            Err(e) => {
                warn!("rate limit check failed, proceeding: {}", e);
                return Duration::ZERO;
            }
        };
        let now = chrono::Utc::now().timestamp();
        match self.wait_for(&quota, now) {
            Some(wait) => {
                info!(
                    "rate limit low ({} remaining), waiting {:?} for reset",
                    quota.remaining, wait
                );
                tokio::time::sleep(wait).await;
                wait
            }
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Quota, ()>);

    impl QuotaSource for Fixed {
        async fn quota(&self) -> Result<Quota, FetchError> {
            self.0.map_err(|_| FetchError::Transport {
                endpoint: "/rate_limit".into(),
                status: Some(500),
                message: "down".into(),
            })
        }
    }

    #[test]
    fn low_quota_waits_until_reset_plus_one() {
        let g = RateGovernor::default();
        let wait = g.wait_for(&Quota { remaining: 5, reset: 1_003 }, 1_000).unwrap();
        assert!(wait >= Duration::from_secs(3) && wait <= Duration::from_secs(4));
    }

    #[test]
    fn healthy_quota_does_not_wait() {
        let g = RateGovernor::default();
        assert_eq!(g.wait_for(&Quota { remaining: 50, reset: 1_003 }, 1_000), None);
        assert_eq!(g.wait_for(&Quota { remaining: 10, reset: 1_003 }, 1_000), None);
    }

    #[test]
    fn reset_in_the_past_does_not_wait() {
        let g = RateGovernor::default();
        assert_eq!(g.wait_for(&Quota { remaining: 0, reset: 999 }, 1_000), None);
        assert_eq!(g.wait_for(&Quota { remaining: 0, reset: 1_000 }, 1_000), None);
    }

    #[test]
    fn wait_is_capped() {
        let g = RateGovernor::default();
        let wait = g.wait_for(&Quota { remaining: 0, reset: 10_000 }, 1_000).unwrap();
        assert_eq!(wait, DEFAULT_MAX_WAIT);
    }

    #[tokio::test]
    async fn failed_check_proceeds_immediately() {
        let g = RateGovernor::default();
        assert_eq!(g.ensure_quota(&Fixed(Err(()))).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn low_quota_sleeps() {
        let g = RateGovernor::default();
        let reset = chrono::Utc::now().timestamp() + 3;
        let waited = g.ensure_quota(&Fixed(Ok(Quota { remaining: 5, reset }))).await;
        assert!(waited >= Duration::from_secs(3) && waited <= Duration::from_secs(4));
    }
}
