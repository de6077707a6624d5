//! Bounded retry for deliveries that can transiently fail.
//!
//! The indicator host can report itself temporarily busy; the guard retries
//! the identical delivery up to a fixed budget instead of routing the
//! failure back through a message queue.

use std::error::Error;
use thiserror::Error;
use tracing::debug;

/// Maximum number of retries after the initial attempt.
pub const RETRY_BUDGET: u32 = 10;

/// Outcome of a guarded delivery that did not succeed.
#[derive(Error, Debug)]
pub enum DeliveryError<E: Error + 'static> {
    /// The retry budget was exhausted; the delivery is lost. Non-fatal:
    /// the next real state change re-synchronizes.
    #[error("delivery abandoned after {attempts} attempts")]
    Abandoned { attempts: u32 },

    /// The failure cause was not transient; no retry was attempted.
    #[error(transparent)]
    Failed(E),
}

/// Per-channel delivery guard with a consecutive-failure counter.
#[derive(Debug)]
pub struct DeliveryGuard {
    budget: u32,
    failures: u32,
}

impl DeliveryGuard {
    /// Create a guard with the given retry budget.
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            failures: 0,
        }
    }

    /// Consecutive transient failures seen so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Run `attempt` until it succeeds, fails permanently, or the retry
    /// budget is exhausted.
    ///
    /// `is_transient` classifies errors; only transient ones are retried.
    /// Any success resets the failure counter. Exhausting the budget also
    /// resets it, so the next delivery starts fresh.
    pub fn deliver<T, E, F, P>(
        &mut self,
        mut attempt: F,
        is_transient: P,
    ) -> Result<T, DeliveryError<E>>
    where
        E: Error + 'static,
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        loop {
            match attempt() {
                Ok(value) => {
                    self.failures = 0;
                    return Ok(value);
                }
                Err(err) if is_transient(&err) => {
                    self.failures += 1;
                    if self.failures > self.budget {
                        let attempts = self.failures;
                        self.failures = 0;
                        return Err(DeliveryError::Abandoned { attempts });
                    }
                    debug!(
                        "transient delivery failure ({}/{} retries): {}",
                        self.failures, self.budget, err
                    );
                }
                Err(err) => return Err(DeliveryError::Failed(err)),
            }
        }
    }
}

impl Default for DeliveryGuard {
    fn default() -> Self {
        Self::new(RETRY_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug, PartialEq, Eq)]
    enum TestError {
        #[error("busy")]
        Busy,
        #[error("broken")]
        Broken,
    }

    fn is_busy(err: &TestError) -> bool {
        matches!(err, TestError::Busy)
    }

    /// Fails with `Busy` `failures` times, then succeeds.
    fn flaky(failures: u32) -> impl FnMut() -> Result<u32, TestError> {
        let mut remaining = failures;
        move || {
            if remaining > 0 {
                remaining -= 1;
                Err(TestError::Busy)
            } else {
                Ok(42)
            }
        }
    }

    #[test]
    fn test_success_first_try() {
        let mut guard = DeliveryGuard::default();
        assert_eq!(guard.deliver(flaky(0), is_busy).unwrap(), 42);
        assert_eq!(guard.failures(), 0);
    }

    #[test]
    fn test_transient_failures_within_budget_succeed() {
        let mut guard = DeliveryGuard::default();
        assert_eq!(guard.deliver(flaky(10), is_busy).unwrap(), 42);
        // Counter resets on success.
        assert_eq!(guard.failures(), 0);
    }

    #[test]
    fn test_eleven_consecutive_failures_abandon() {
        let mut guard = DeliveryGuard::default();
        // Never succeeds: initial attempt plus 10 retries, then abandoned.
        let err = guard
            .deliver(flaky(u32::MAX), is_busy)
            .expect_err("should abandon");
        assert!(matches!(err, DeliveryError::Abandoned { attempts: 11 }));
    }

    #[test]
    fn test_counter_resets_after_abandonment() {
        let mut guard = DeliveryGuard::default();
        let _ = guard.deliver(flaky(u32::MAX), is_busy);
        assert_eq!(guard.failures(), 0);
        // Next delivery gets a full budget again.
        assert_eq!(guard.deliver(flaky(10), is_busy).unwrap(), 42);
    }

    #[test]
    fn test_non_transient_failure_surfaces_immediately() {
        let mut guard = DeliveryGuard::default();
        let mut attempts = 0;
        let err = guard
            .deliver(
                || -> Result<(), TestError> {
                    attempts += 1;
                    Err(TestError::Broken)
                },
                is_busy,
            )
            .expect_err("should fail");
        assert!(matches!(err, DeliveryError::Failed(TestError::Broken)));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_zero_budget_abandons_after_first_failure() {
        let mut guard = DeliveryGuard::new(0);
        let err = guard
            .deliver(flaky(u32::MAX), is_busy)
            .expect_err("should abandon");
        assert!(matches!(err, DeliveryError::Abandoned { attempts: 1 }));
    }
}
