//! Status indicator projection.
//!
//! Projects the tracked session locality into the persistent indicator area
//! (icon plus tooltip) and re-asserts it when the indicator host signals its
//! area was reset, e.g. after the surrounding shell restarted.

use crate::domain::SessionLocality;
use crate::retry::{DeliveryError, DeliveryGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the indicator host.
#[derive(Error, Debug)]
pub enum IndicatorError {
    /// The host accepted the request but is temporarily busy.
    #[error("indicator host busy")]
    Busy,

    /// The entry was already gone. Removal treats this as success.
    #[error("indicator entry absent")]
    Absent,

    #[error("indicator host failure: {0}")]
    Host(String),

    /// The retry budget for an update was exhausted. Non-fatal; the next
    /// session event re-synchronizes the indicator.
    #[error("indicator update abandoned after {attempts} attempts")]
    Abandoned { attempts: u32 },
}

/// Icon and tooltip shown for a locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorContent {
    pub icon: &'static str,
    pub tooltip: &'static str,
}

/// Map a locality to its indicator content.
pub fn content_for(locality: SessionLocality) -> IndicatorContent {
    match locality {
        SessionLocality::None => IndicatorContent {
            icon: "session-none",
            tooltip: "No session attached",
        },
        SessionLocality::Local => IndicatorContent {
            icon: "session-local",
            tooltip: "Session input is local",
        },
        SessionLocality::Remote => IndicatorContent {
            icon: "session-remote",
            tooltip: "Session input is remote",
        },
    }
}

/// Host service rendering a keyed entry in the persistent indicator area.
pub trait IndicatorHost: Send {
    /// Register the entry with the host.
    fn create(&mut self) -> Result<(), IndicatorError>;

    /// Change the entry's icon and tooltip.
    fn update(&mut self, content: IndicatorContent) -> Result<(), IndicatorError>;

    /// Unregister the entry.
    fn remove(&mut self) -> Result<(), IndicatorError>;
}

/// Keeps the external indicator consistent with the last-known locality.
pub struct StatusReflector {
    host: Box<dyn IndicatorHost>,
    guard: DeliveryGuard,
    last: SessionLocality,
}

impl StatusReflector {
    /// Create a reflector over the given host.
    pub fn new(host: Box<dyn IndicatorHost>) -> Self {
        Self {
            host,
            guard: DeliveryGuard::default(),
            last: SessionLocality::None,
        }
    }

    /// Locality most recently handed to [`set`](Self::set).
    pub fn last_locality(&self) -> SessionLocality {
        self.last
    }

    /// First-time registration with the indicator host.
    ///
    /// A stale entry may remain from a prior unclean exit; remove it first,
    /// ignoring the outcome.
    pub fn create(&mut self) -> Result<(), IndicatorError> {
        if self.host.remove().is_ok() {
            debug!("removed stale indicator entry");
        }
        self.host.create()?;
        self.set(self.last)
    }

    /// Update the indicator to show `locality`.
    ///
    /// The locality is recorded as last-known even when the update fails, so
    /// a later host reset re-asserts the correct state. Transient host
    /// failures are retried through the delivery guard.
    pub fn set(&mut self, locality: SessionLocality) -> Result<(), IndicatorError> {
        self.last = locality;
        let content = content_for(locality);
        let host = &mut self.host;
        self.guard
            .deliver(|| host.update(content), |e| matches!(e, IndicatorError::Busy))
            .map_err(|err| match err {
                DeliveryError::Abandoned { attempts } => IndicatorError::Abandoned { attempts },
                DeliveryError::Failed(e) => e,
            })
    }

    /// Handle the host's "indicator area was reset" notification.
    ///
    /// Recreation is never skipped: the entry may legitimately still exist,
    /// so a create failure is logged and the content update runs regardless.
    pub fn on_host_reset(&mut self) -> Result<(), IndicatorError> {
        info!("indicator host reset, re-asserting {}", self.last.as_str());
        if let Err(err) = self.host.create() {
            debug!("indicator re-create failed (may already exist): {err}");
        }
        self.set(self.last)
    }

    /// Unregister the entry. Tolerates an entry that is already absent.
    pub fn remove(&mut self) -> Result<(), IndicatorError> {
        match self.host.remove() {
            Ok(()) | Err(IndicatorError::Absent) => Ok(()),
            Err(err) => {
                warn!("indicator removal failed: {err}");
                Err(err)
            }
        }
    }
}

/// Indicator host that renders nothing and logs every call.
///
/// Stands in for a real indicator-area service; shells integrate by
/// implementing [`IndicatorHost`] themselves.
#[derive(Debug, Default)]
pub struct LoggingIndicatorHost {
    registered: bool,
}

impl IndicatorHost for LoggingIndicatorHost {
    fn create(&mut self) -> Result<(), IndicatorError> {
        self.registered = true;
        info!("indicator registered");
        Ok(())
    }

    fn update(&mut self, content: IndicatorContent) -> Result<(), IndicatorError> {
        info!("indicator: icon={} tooltip={:?}", content.icon, content.tooltip);
        Ok(())
    }

    fn remove(&mut self) -> Result<(), IndicatorError> {
        if !self.registered {
            return Err(IndicatorError::Absent);
        }
        self.registered = false;
        info!("indicator removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct HostState {
        creates: u32,
        removes: u32,
        updates: Vec<IndicatorContent>,
        busy_updates_remaining: u32,
        fail_create: bool,
        absent: bool,
    }

    #[derive(Clone, Default)]
    struct FakeHost(Arc<Mutex<HostState>>);

    impl IndicatorHost for FakeHost {
        fn create(&mut self) -> Result<(), IndicatorError> {
            let mut state = self.0.lock().unwrap();
            state.creates += 1;
            if state.fail_create {
                return Err(IndicatorError::Host("create failed".to_string()));
            }
            Ok(())
        }

        fn update(&mut self, content: IndicatorContent) -> Result<(), IndicatorError> {
            let mut state = self.0.lock().unwrap();
            if state.busy_updates_remaining > 0 {
                state.busy_updates_remaining -= 1;
                return Err(IndicatorError::Busy);
            }
            state.updates.push(content);
            Ok(())
        }

        fn remove(&mut self) -> Result<(), IndicatorError> {
            let mut state = self.0.lock().unwrap();
            state.removes += 1;
            if state.absent {
                return Err(IndicatorError::Absent);
            }
            Ok(())
        }
    }

    fn reflector_with(state: &FakeHost) -> StatusReflector {
        StatusReflector::new(Box::new(state.clone()))
    }

    #[test]
    fn test_set_updates_content_and_last() {
        let host = FakeHost::default();
        let mut reflector = reflector_with(&host);

        reflector.set(SessionLocality::Remote).unwrap();

        assert_eq!(reflector.last_locality(), SessionLocality::Remote);
        let state = host.0.lock().unwrap();
        assert_eq!(state.updates, vec![content_for(SessionLocality::Remote)]);
    }

    #[test]
    fn test_set_retries_busy_host() {
        let host = FakeHost::default();
        host.0.lock().unwrap().busy_updates_remaining = 3;
        let mut reflector = reflector_with(&host);

        reflector.set(SessionLocality::Local).unwrap();

        let state = host.0.lock().unwrap();
        assert_eq!(state.updates.len(), 1);
    }

    #[test]
    fn test_set_abandons_past_budget() {
        let host = FakeHost::default();
        host.0.lock().unwrap().busy_updates_remaining = u32::MAX;
        let mut reflector = reflector_with(&host);

        let err = reflector.set(SessionLocality::Local).unwrap_err();
        assert!(matches!(err, IndicatorError::Abandoned { attempts: 11 }));
        // Last-known locality still advanced.
        assert_eq!(reflector.last_locality(), SessionLocality::Local);
    }

    #[test]
    fn test_host_reset_reasserts_even_when_create_fails() {
        let host = FakeHost::default();
        let mut reflector = reflector_with(&host);
        reflector.set(SessionLocality::Remote).unwrap();

        host.0.lock().unwrap().fail_create = true;
        reflector.on_host_reset().unwrap();

        let state = host.0.lock().unwrap();
        assert_eq!(state.updates.len(), 2);
        assert_eq!(state.updates[1], content_for(SessionLocality::Remote));
    }

    #[test]
    fn test_create_removes_stale_entry_first() {
        let host = FakeHost::default();
        let mut reflector = reflector_with(&host);

        reflector.create().unwrap();

        let state = host.0.lock().unwrap();
        assert_eq!(state.removes, 1);
        assert_eq!(state.creates, 1);
        // Initial content asserted right after registration.
        assert_eq!(state.updates, vec![content_for(SessionLocality::None)]);
    }

    #[test]
    fn test_remove_tolerates_absent_entry() {
        let host = FakeHost::default();
        host.0.lock().unwrap().absent = true;
        let mut reflector = reflector_with(&host);

        assert!(reflector.remove().is_ok());
        assert!(reflector.remove().is_ok());
    }

    #[test]
    fn test_logging_host_remove_is_absent_when_unregistered() {
        let mut host = LoggingIndicatorHost::default();
        assert!(matches!(host.remove(), Err(IndicatorError::Absent)));
        host.create().unwrap();
        assert!(host.remove().is_ok());
    }
}
