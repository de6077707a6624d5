//! Domain types for session locality tracking.

use serde::Deserialize;
use serde::Serialize;

/// Where console input for the current session comes from.
///
/// `None` means no session is attached to the console (lock or logoff
/// screen); `Local` means input is local; `Remote` means input arrives over
/// a remote display connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionLocality {
    #[default]
    None,
    Local,
    Remote,
}

impl SessionLocality {
    /// Get the locality as a display string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Session-change notifications delivered by the OS session watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The console was attached with local input.
    ConsoleAttachLocal,
    /// The console was detached; no session remains attached.
    ConsoleDetach,
    /// A remote display session took over the console.
    RemoteAttach,
    /// The remote display session disconnected.
    RemoteDetach,
}

/// Idle-suppression tactic run on each timer tick while armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressionStrategy {
    /// Synthesize a zero-displacement pointer movement.
    InputInjection,
    /// Re-read and re-write the idle timeout so the write counts as activity.
    #[default]
    TimeoutReaffirmation,
}

impl SuppressionStrategy {
    /// Get the strategy as a display string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputInjection => "input-injection",
            Self::TimeoutReaffirmation => "timeout-reaffirmation",
        }
    }
}

/// Commands reachable from the status indicator's context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Switch the active suppression strategy.
    SelectStrategy(SuppressionStrategy),
    /// Show the about information.
    About,
    /// Quit the daemon.
    Exit,
}

/// Everything the control loop can be woken by besides session events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// A menu command from the selection surface.
    Menu(MenuCommand),
    /// The indicator host signalled its indicator area was reset.
    IndicatorHostReset,
    /// Explicit shutdown request.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        strategy: SuppressionStrategy,
    }

    #[test]
    fn test_locality_strings() {
        assert_eq!(SessionLocality::None.as_str(), "none");
        assert_eq!(SessionLocality::Local.as_str(), "local");
        assert_eq!(SessionLocality::Remote.as_str(), "remote");
    }

    #[test]
    fn test_default_locality_is_none() {
        assert_eq!(SessionLocality::default(), SessionLocality::None);
    }

    #[test]
    fn test_default_strategy_is_timeout_reaffirmation() {
        assert_eq!(
            SuppressionStrategy::default(),
            SuppressionStrategy::TimeoutReaffirmation
        );
    }

    #[test]
    fn test_strategy_parses_kebab_case() {
        let w: Wrapper = toml::from_str("strategy = \"input-injection\"").unwrap();
        assert_eq!(w.strategy, SuppressionStrategy::InputInjection);

        let w: Wrapper = toml::from_str("strategy = \"timeout-reaffirmation\"").unwrap();
        assert_eq!(w.strategy, SuppressionStrategy::TimeoutReaffirmation);
    }
}
