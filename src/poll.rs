use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ScrapeError;

/// Bound for "act while the page still offers something to act on" loops.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polled {
    pub activations: u32,
    /// `false` when the loop stopped on `max_attempts` rather than on the probe.
    pub settled: bool,
}

/// Run `probe`; while it yields a target, `act` on it and wait `interval`.
pub async fn poll_while<T, P, PF, A, AF>(
    policy: &PollPolicy,
    mut probe: P,
    mut act: A,
) -> Result<Polled, ScrapeError>
where
    P: FnMut() -> PF,
    PF: Future<Output = Result<Option<T>, ScrapeError>>,
    A: FnMut(T) -> AF,
    AF: Future<Output = Result<(), ScrapeError>>,
{
    let mut activations = 0;
    loop {
        let Some(target) = probe().await? else {
            return Ok(Polled {
                activations,
                settled: true,
            });
        };
        if activations >= policy.max_attempts {
            return Ok(Polled {
                activations,
                settled: false,
            });
        }
        act(target).await?;
        activations += 1;
        if !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

/// Retry `op` with exponential backoff while it fails with a transient error.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; backing off {:.1}s",
                    label,
                    attempt + 1,
                    policy.max_retries,
                    e,
                    backoff.as_secs_f64()
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
