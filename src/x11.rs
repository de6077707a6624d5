//! X11 idle-lock policy access and synthetic input injection.
//!
//! The core protocol's screen-saver requests carry the idle timeout; XTEST
//! provides the zero-displacement pointer movement used by the
//! input-injection strategy.

use crate::policy::{IdlePolicy, PolicyError};
use crate::suppress::{InputInjector, SuppressError};
use anyhow::{Context, Result};
use std::time::Duration;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetScreenSaverReply, MOTION_NOTIFY_EVENT, Window};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

/// X server client for policy queries and input injection.
pub struct X11Client {
    conn: RustConnection,
    root: Window,
}

impl X11Client {
    /// Connect to the X server and verify XTEST is available.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).context("failed to connect to X server")?;
        let root = conn.setup().roots[screen_num].root;

        conn.xtest_get_version(2, 2)
            .context("XTEST version request failed")?
            .reply()
            .context("XTEST extension not available")?;

        Ok(Self { conn, root })
    }

    fn screen_saver(&self) -> Result<GetScreenSaverReply, PolicyError> {
        self.conn
            .get_screen_saver()
            .map_err(|e| PolicyError::Query(e.to_string()))?
            .reply()
            .map_err(|e| PolicyError::Query(e.to_string()))
    }
}

impl IdlePolicy for X11Client {
    fn is_lock_enabled(&mut self) -> Result<bool, PolicyError> {
        Ok(self.screen_saver()?.timeout > 0)
    }

    fn timeout(&mut self) -> Result<Duration, PolicyError> {
        Ok(Duration::from_secs(u64::from(self.screen_saver()?.timeout)))
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PolicyError> {
        // Only the timeout changes; blanking and exposure settings pass
        // through unchanged.
        let current = self.screen_saver()?;
        let seconds = i16::try_from(timeout.as_secs()).unwrap_or(i16::MAX);
        let interval = i16::try_from(current.interval).unwrap_or(i16::MAX);
        self.conn
            .set_screen_saver(
                seconds,
                interval,
                current.prefer_blanking,
                current.allow_exposures,
            )
            .map_err(|e| PolicyError::Update(e.to_string()))?
            .check()
            .map_err(|e| PolicyError::Update(e.to_string()))
    }
}

impl InputInjector for X11Client {
    fn nudge_pointer(&mut self) -> Result<(), SuppressError> {
        // Relative motion of (0, 0): counts as input, moves nothing.
        self.conn
            .xtest_fake_input(
                MOTION_NOTIFY_EVENT,
                1, // relative coordinates
                x11rb::CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )
            .map_err(|e| SuppressError::Inject(e.to_string()))?
            .check()
            .map_err(|e| SuppressError::Inject(e.to_string()))
    }
}
