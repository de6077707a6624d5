//! Idle-suppression tactics.
//!
//! Two interchangeable ways of keeping the idle lock from firing: injecting
//! a synthetic no-op input event, or re-writing the idle timeout so the
//! write itself counts as recent activity.

use crate::domain::SuppressionStrategy;
use crate::policy::{IdlePolicy, PolicyError};
use thiserror::Error;

/// Errors from a single suppression action.
#[derive(Error, Debug)]
pub enum SuppressError {
    /// A previous suppression action is still in flight. The tick path
    /// drops this silently; the next tick covers it.
    #[error("suppression action already in progress")]
    Busy,

    #[error(transparent)]
    Policy(PolicyError),

    #[error("input injection failed: {0}")]
    Inject(String),
}

/// Synthetic no-op input injection.
pub trait InputInjector: Send {
    /// Inject a zero-displacement pointer movement.
    fn nudge_pointer(&mut self) -> Result<(), SuppressError>;
}

/// Run one suppression action for the given strategy.
pub fn run_once(
    strategy: SuppressionStrategy,
    policy: &mut dyn IdlePolicy,
    injector: &mut dyn InputInjector,
) -> Result<(), SuppressError> {
    match strategy {
        SuppressionStrategy::InputInjection => injector.nudge_pointer(),
        SuppressionStrategy::TimeoutReaffirmation => {
            let timeout = policy.timeout().map_err(busy_or_policy)?;
            policy.set_timeout(timeout).map_err(busy_or_policy)?;
            Ok(())
        }
    }
}

fn busy_or_policy(err: PolicyError) -> SuppressError {
    match err {
        PolicyError::Busy => SuppressError::Busy,
        other => SuppressError::Policy(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FakePolicy {
        timeout: Duration,
        written: Vec<Duration>,
        fail_read: Option<PolicyError>,
    }

    impl FakePolicy {
        fn new(timeout: Duration) -> Self {
            Self {
                timeout,
                written: Vec::new(),
                fail_read: None,
            }
        }
    }

    impl IdlePolicy for FakePolicy {
        fn is_lock_enabled(&mut self) -> Result<bool, PolicyError> {
            Ok(self.timeout > Duration::ZERO)
        }

        fn timeout(&mut self) -> Result<Duration, PolicyError> {
            if let Some(err) = self.fail_read.take() {
                return Err(err);
            }
            Ok(self.timeout)
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<(), PolicyError> {
            self.written.push(timeout);
            Ok(())
        }
    }

    struct FakeInjector {
        nudges: u32,
        busy: bool,
    }

    impl InputInjector for FakeInjector {
        fn nudge_pointer(&mut self) -> Result<(), SuppressError> {
            if self.busy {
                return Err(SuppressError::Busy);
            }
            self.nudges += 1;
            Ok(())
        }
    }

    #[test]
    fn test_injection_nudges_pointer() {
        let mut policy = FakePolicy::new(Duration::from_secs(300));
        let mut injector = FakeInjector {
            nudges: 0,
            busy: false,
        };

        run_once(
            SuppressionStrategy::InputInjection,
            &mut policy,
            &mut injector,
        )
        .unwrap();

        assert_eq!(injector.nudges, 1);
        assert!(policy.written.is_empty());
    }

    #[test]
    fn test_reaffirmation_writes_back_same_value() {
        let mut policy = FakePolicy::new(Duration::from_secs(300));
        let mut injector = FakeInjector {
            nudges: 0,
            busy: false,
        };

        run_once(
            SuppressionStrategy::TimeoutReaffirmation,
            &mut policy,
            &mut injector,
        )
        .unwrap();

        assert_eq!(policy.written, vec![Duration::from_secs(300)]);
        assert_eq!(injector.nudges, 0);
    }

    #[test]
    fn test_busy_policy_maps_to_busy() {
        let mut policy = FakePolicy::new(Duration::from_secs(300));
        policy.fail_read = Some(PolicyError::Busy);
        let mut injector = FakeInjector {
            nudges: 0,
            busy: false,
        };

        let err = run_once(
            SuppressionStrategy::TimeoutReaffirmation,
            &mut policy,
            &mut injector,
        )
        .unwrap_err();

        assert!(matches!(err, SuppressError::Busy));
        assert!(policy.written.is_empty());
    }

    #[test]
    fn test_failed_read_surfaces_policy_error() {
        let mut policy = FakePolicy::new(Duration::from_secs(300));
        policy.fail_read = Some(PolicyError::Query("no reply".to_string()));
        let mut injector = FakeInjector {
            nudges: 0,
            busy: false,
        };

        let err = run_once(
            SuppressionStrategy::TimeoutReaffirmation,
            &mut policy,
            &mut injector,
        )
        .unwrap_err();

        assert!(matches!(err, SuppressError::Policy(PolicyError::Query(_))));
    }

    #[test]
    fn test_busy_injector_surfaces_busy() {
        let mut policy = FakePolicy::new(Duration::from_secs(300));
        let mut injector = FakeInjector {
            nudges: 0,
            busy: true,
        };

        let err = run_once(
            SuppressionStrategy::InputInjection,
            &mut policy,
            &mut injector,
        )
        .unwrap_err();

        assert!(matches!(err, SuppressError::Busy));
    }
}
