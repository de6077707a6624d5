//! Session locality state machine.
//!
//! Owns the current locality, the selected suppression strategy, and the
//! suppression timer state, and drives the status reflector and selection
//! surface from session-change events. Every transition runs on the control
//! task, strictly sequentially.

use crate::domain::{SessionEvent, SessionLocality, SuppressionStrategy};
use crate::indicator::{IndicatorError, StatusReflector};
use crate::policy::{IdlePolicy, PolicyError, suppression_period};
use crate::suppress::{self, InputInjector, SuppressError};
use crate::surface::{MenuError, SelectionSurface};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by tracker operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("strategy selection rejected: {0}")]
    Selection(MenuError),

    #[error(transparent)]
    Suppress(SuppressError),
}

impl TrackerError {
    /// Whether the daemon should stop on this error.
    ///
    /// A rejected selection rolls back to a consistent state. Everything
    /// else leaves the idle policy or indicator in an unknown state, and the
    /// daemon stops rather than run inconsistent.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Selection(_))
    }
}

/// Armed suppression timer. Created on arm, dropped on disarm.
///
/// The generation increments on every arm, so a tick queued before a disarm
/// or strategy switch is recognized as stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub period: Duration,
    pub generation: u64,
}

/// The session-state tracker.
pub struct SessionTracker {
    policy: Box<dyn IdlePolicy>,
    injector: Box<dyn InputInjector>,
    reflector: StatusReflector,
    surface: SelectionSurface,
    locality: SessionLocality,
    strategy: SuppressionStrategy,
    timer: Option<ArmedTimer>,
    generation: u64,
    dry_run: bool,
}

impl SessionTracker {
    /// Create a tracker with the given collaborators and initial strategy.
    pub fn new(
        policy: Box<dyn IdlePolicy>,
        injector: Box<dyn InputInjector>,
        reflector: StatusReflector,
        surface: SelectionSurface,
        strategy: SuppressionStrategy,
        dry_run: bool,
    ) -> Self {
        Self {
            policy,
            injector,
            reflector,
            surface,
            locality: SessionLocality::None,
            strategy,
            timer: None,
            generation: 0,
            dry_run,
        }
    }

    /// Current session locality.
    pub fn locality(&self) -> SessionLocality {
        self.locality
    }

    /// Currently selected suppression strategy.
    pub fn strategy(&self) -> SuppressionStrategy {
        self.strategy
    }

    /// Armed timer state, if the suppression timer is running.
    pub fn armed(&self) -> Option<ArmedTimer> {
        self.timer
    }

    /// Register the status indicator, clearing any stale entry left by a
    /// prior unclean exit.
    pub fn create_indicator(&mut self) -> Result<(), TrackerError> {
        let result = self.reflector.create();
        Self::tolerate_abandoned(result)
    }

    /// Apply one session-change event.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<(), TrackerError> {
        debug!("session change: {event:?}");
        match event {
            SessionEvent::ConsoleAttachLocal => {
                self.disarm();
                self.locality = SessionLocality::Local;
            }
            SessionEvent::ConsoleDetach => {
                // Normally already disarmed on leaving Remote; calling it
                // again covers a lost remote-detach notification.
                self.disarm();
                self.locality = SessionLocality::None;
            }
            SessionEvent::RemoteAttach => {
                self.locality = SessionLocality::Remote;
                self.arm()?;
            }
            SessionEvent::RemoteDetach => {
                self.disarm();
                self.locality = SessionLocality::None;
            }
        }
        self.reflect()
    }

    /// Startup reconciliation: adopt the locality from a one-shot query.
    pub fn reconcile(&mut self, current: SessionLocality) -> Result<(), TrackerError> {
        info!("initial session state: {}", current.as_str());
        self.locality = current;
        if current == SessionLocality::Remote {
            self.arm()?;
        } else {
            self.disarm();
        }
        self.reflect()
    }

    /// Switch the active suppression strategy.
    ///
    /// Disarms the old strategy and re-arms the new one before the check
    /// marks move; the generation bump guarantees no queued tick fires
    /// against the old strategy. If either menu update (or the re-arm)
    /// fails, the selection rolls back to its previous value and the change
    /// is rejected.
    pub fn select_strategy(
        &mut self,
        strategy: SuppressionStrategy,
    ) -> Result<(), TrackerError> {
        let previous = self.strategy;
        self.surface
            .set_checked(previous, false)
            .map_err(TrackerError::Selection)?;

        self.disarm();
        self.strategy = strategy;
        if self.locality == SessionLocality::Remote {
            if let Err(err) = self.arm() {
                self.rollback_selection(previous);
                return Err(err);
            }
        }

        if let Err(err) = self.surface.set_checked(strategy, true) {
            self.rollback_selection(previous);
            return Err(TrackerError::Selection(err));
        }

        info!("suppression strategy: {}", strategy.as_str());
        Ok(())
    }

    /// Run one suppression action if the given timer generation is still
    /// current.
    ///
    /// A stale or post-disarm tick is a no-op. A busy outcome is dropped
    /// silently; the next tick covers it.
    pub fn tick(&mut self, generation: u64) -> Result<(), TrackerError> {
        if self.timer.map(|t| t.generation) != Some(generation) {
            debug!("dropping stale suppression tick (generation {generation})");
            return Ok(());
        }

        if self.dry_run {
            info!("[DRY RUN] would run {} action", self.strategy.as_str());
            return Ok(());
        }

        match suppress::run_once(self.strategy, self.policy.as_mut(), self.injector.as_mut()) {
            Ok(()) => {
                debug!("suppression action ran ({})", self.strategy.as_str());
                Ok(())
            }
            Err(SuppressError::Busy) => {
                debug!("suppression action still in progress, skipping tick");
                Ok(())
            }
            Err(err) => Err(TrackerError::Suppress(err)),
        }
    }

    /// Ordered teardown: disarm, remove the indicator, release the menu.
    ///
    /// Each step tolerates the resource already being absent.
    pub fn shutdown(&mut self) {
        self.disarm();
        let _ = self.reflector.remove();
        self.surface.release();
    }

    /// Re-assert the indicator after its host reset.
    pub fn on_indicator_reset(&mut self) -> Result<(), TrackerError> {
        let result = self.reflector.on_host_reset();
        Self::tolerate_abandoned(result)
    }

    /// Arm the suppression timer for the current strategy.
    ///
    /// A disabled idle-lock policy makes this a no-op: there is nothing to
    /// suppress. Re-arming while armed replaces the timer with a fresh
    /// period and generation.
    fn arm(&mut self) -> Result<(), TrackerError> {
        if !self.policy.is_lock_enabled()? {
            debug!("idle lock disabled, suppression not needed");
            self.timer = None;
            return Ok(());
        }

        let timeout = self.policy.timeout()?;
        let period = suppression_period(timeout);
        self.generation += 1;
        self.timer = Some(ArmedTimer {
            period,
            generation: self.generation,
        });
        info!(
            "suppression armed: {} every {period:?}",
            self.strategy.as_str()
        );
        Ok(())
    }

    /// Disarm the suppression timer. Safe to call when not armed.
    fn disarm(&mut self) {
        if self.timer.take().is_some() {
            info!("suppression disarmed");
        }
    }

    fn rollback_selection(&mut self, previous: SuppressionStrategy) {
        self.disarm();
        self.strategy = previous;
        if self.locality == SessionLocality::Remote {
            if let Err(err) = self.arm() {
                warn!("re-arm after selection rollback failed: {err}");
            }
        }
        if let Err(err) = self.surface.set_checked(previous, true) {
            warn!("restoring previous selection mark failed: {err}");
        }
    }

    /// Push the current locality to the indicator.
    ///
    /// An abandoned update is reported but not fatal; the next session event
    /// re-synchronizes the indicator.
    fn reflect(&mut self) -> Result<(), TrackerError> {
        let result = self.reflector.set(self.locality);
        Self::tolerate_abandoned(result)
    }

    fn tolerate_abandoned(result: Result<(), IndicatorError>) -> Result<(), TrackerError> {
        match result {
            Ok(()) => Ok(()),
            Err(IndicatorError::Abandoned { attempts }) => {
                warn!("indicator update lost after {attempts} attempts");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
