//! Retry loop: run a closure until success or the policy says stop.

use std::time::Duration;

use super::classify::Classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::{CancelToken, Cancelled};

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// Between attempts it sleeps for the backoff delay on `cancel`; a cancellation
/// during the sleep ends the loop immediately with `E::from(Cancelled)`.
/// `on_retry` is told about each retry (attempt that failed, its error, delay).
pub fn run_with_retry<T, E, F, R>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut on_retry: R,
    mut f: F,
) -> Result<T, E>
where
    E: Classify + From<Cancelled>,
    F: FnMut() -> Result<T, E>,
    R: FnMut(u32, &E, Duration),
{
    let mut attempt = 1u32;
    loop {
        cancel.check()?;
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, e.kind()) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    on_retry(attempt, &e, d);
                    cancel.sleep(d)?;
                    attempt += 1;
                }
            },
        }
    }
}
