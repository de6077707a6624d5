//! Session-change event sources.
//!
//! Abstraction over the OS facility that announces console attach/detach
//! and remote connect/disconnect for the current session.

pub mod logind;

use crate::domain::{SessionEvent, SessionLocality};
use async_trait::async_trait;
use thiserror::Error;

pub use logind::LogindSource;

/// Errors that can occur in session-change detection.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session bus connection failed: {0}")]
    ConnectionFailed(String),

    #[error("session lookup failed: {0}")]
    Lookup(String),

    #[error("session property read failed: {0}")]
    Property(String),
}

/// Source of session-change notifications.
#[async_trait]
pub trait SessionSource: Send {
    /// Query the current locality once.
    ///
    /// Used for the startup reconciliation that determines the true initial
    /// state before any notification has arrived.
    async fn current_locality(&mut self) -> Result<SessionLocality, SessionError>;

    /// Wait for the next session-change event.
    async fn next_event(&mut self) -> Result<SessionEvent, SessionError>;
}

/// Derive a session event from an activity flip on a session whose `remote`
/// flag is known.
fn classify(active: bool, remote: bool) -> SessionEvent {
    match (active, remote) {
        (true, false) => SessionEvent::ConsoleAttachLocal,
        (true, true) => SessionEvent::RemoteAttach,
        (false, true) => SessionEvent::RemoteDetach,
        (false, false) => SessionEvent::ConsoleDetach,
    }
}

/// Locality of a session given its activity and remote flags.
fn locality_of(active: bool, remote: bool) -> SessionLocality {
    if !active {
        SessionLocality::None
    } else if remote {
        SessionLocality::Remote
    } else {
        SessionLocality::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_activity_flips() {
        assert_eq!(classify(true, false), SessionEvent::ConsoleAttachLocal);
        assert_eq!(classify(true, true), SessionEvent::RemoteAttach);
        assert_eq!(classify(false, true), SessionEvent::RemoteDetach);
        assert_eq!(classify(false, false), SessionEvent::ConsoleDetach);
    }

    #[test]
    fn test_locality_of_flags() {
        assert_eq!(locality_of(false, false), SessionLocality::None);
        assert_eq!(locality_of(false, true), SessionLocality::None);
        assert_eq!(locality_of(true, false), SessionLocality::Local);
        assert_eq!(locality_of(true, true), SessionLocality::Remote);
    }
}
