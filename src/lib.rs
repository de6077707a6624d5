//! remote-lockd - daemon that suppresses idle screen locking during remote sessions.
//!
//! Tracks whether the current session is driven locally or over a remote
//! display connection, reflects that state in a status indicator, and keeps
//! the idle lock from firing while input arrives remotely.

pub mod config;
pub mod domain;
pub mod indicator;
pub mod policy;
pub mod retry;
pub mod session;
pub mod suppress;
pub mod surface;
pub mod tracker;
pub mod x11;
