//! Selection surface: the strategy options in the indicator's context menu.
//!
//! The two strategies appear as checkable, mutually exclusive menu entries.
//! The surface only renders selection state; all suppression semantics run
//! through the tracker.

use crate::domain::SuppressionStrategy;
use thiserror::Error;
use tracing::info;

/// Errors from the menu host.
#[derive(Error, Debug)]
pub enum MenuError {
    #[error("menu host failure: {0}")]
    Host(String),
}

/// Host service rendering the context menu entries.
pub trait MenuHost: Send {
    /// Set or clear the check mark on a strategy entry.
    fn set_checked(&mut self, strategy: SuppressionStrategy, checked: bool)
    -> Result<(), MenuError>;

    /// Release menu resources. Tolerates being called more than once.
    fn release(&mut self);
}

/// Tracks which strategy entry currently carries the check mark.
pub struct SelectionSurface {
    host: Box<dyn MenuHost>,
    checked: Option<SuppressionStrategy>,
}

impl SelectionSurface {
    /// Create a surface over the given host.
    pub fn new(host: Box<dyn MenuHost>) -> Self {
        Self {
            host,
            checked: None,
        }
    }

    /// Entry currently shown as checked, if any.
    pub fn checked(&self) -> Option<SuppressionStrategy> {
        self.checked
    }

    /// Set or clear the check mark on an entry.
    pub fn set_checked(
        &mut self,
        strategy: SuppressionStrategy,
        checked: bool,
    ) -> Result<(), MenuError> {
        self.host.set_checked(strategy, checked)?;
        if checked {
            self.checked = Some(strategy);
        } else if self.checked == Some(strategy) {
            self.checked = None;
        }
        Ok(())
    }

    /// Release the underlying menu resources.
    pub fn release(&mut self) {
        self.host.release();
    }
}

/// Menu host that renders nothing and logs every call.
#[derive(Debug, Default)]
pub struct LoggingMenuHost;

impl MenuHost for LoggingMenuHost {
    fn set_checked(
        &mut self,
        strategy: SuppressionStrategy,
        checked: bool,
    ) -> Result<(), MenuError> {
        info!(
            "menu: {} {}",
            strategy.as_str(),
            if checked { "checked" } else { "unchecked" }
        );
        Ok(())
    }

    fn release(&mut self) {
        info!("menu released");
    }
}
