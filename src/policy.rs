//! OS idle-lock policy access.
//!
//! The idle-lock policy decides whether the session locks after a period of
//! input inactivity and after how long. The tracker reads it at arm time to
//! size the suppression period.

use std::time::Duration;
use thiserror::Error;

/// Errors from idle-lock policy queries and updates.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The policy service accepted the request but is temporarily busy.
    #[error("idle policy service busy")]
    Busy,

    #[error("idle policy query failed: {0}")]
    Query(String),

    #[error("idle policy update failed: {0}")]
    Update(String),
}

/// Read/write access to the OS idle-lock configuration.
///
/// Pure pass-through, no internal state.
pub trait IdlePolicy: Send {
    /// Whether idle-triggered locking is currently enabled.
    fn is_lock_enabled(&mut self) -> Result<bool, PolicyError>;

    /// Current idle timeout.
    fn timeout(&mut self) -> Result<Duration, PolicyError>;

    /// Overwrite the idle timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PolicyError>;
}

/// Smallest period the suppression timer will run with.
///
/// `timeout - 1s` reaches zero for timeouts of one second or less; the timer
/// still needs a real period.
pub const MIN_SUPPRESSION_PERIOD: Duration = Duration::from_secs(1);

/// Derive the suppression period from the idle-lock timeout.
///
/// Fires one second before the lock would, floored at
/// [`MIN_SUPPRESSION_PERIOD`].
pub fn suppression_period(timeout: Duration) -> Duration {
    timeout
        .saturating_sub(Duration::from_secs(1))
        .max(MIN_SUPPRESSION_PERIOD)
}
