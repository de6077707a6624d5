//! Session-change events via systemd-logind.
//!
//! logind exposes one object per session; its `Remote` property is fixed for
//! the session's lifetime, while `Active` flips when the session gains or
//! loses the console. Watching `Active` on the current session therefore
//! yields exactly the attach/detach notifications the tracker consumes.

use super::{SessionError, SessionSource, classify, locality_of};
use crate::domain::{SessionEvent, SessionLocality};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::env;
use tracing::{debug, info};
use zbus::Connection;
use zbus::proxy::PropertyStream;

const LOGIND_SERVICE: &str = "org.freedesktop.login1";
const LOGIND_PATH: &str = "/org/freedesktop/login1";
const MANAGER_INTERFACE: &str = "org.freedesktop.login1.Manager";
const SESSION_INTERFACE: &str = "org.freedesktop.login1.Session";

/// Session source backed by systemd-logind over the system bus.
pub struct LogindSource {
    session: zbus::Proxy<'static>,
    active_changes: PropertyStream<'static, bool>,
    /// Fixed for the session's lifetime.
    remote: bool,
    last_active: Option<bool>,
}

impl LogindSource {
    /// Connect to logind and subscribe to the current session.
    pub async fn connect() -> Result<Self, SessionError> {
        let conn = Connection::system()
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        let session_path = resolve_session_path(&conn).await?;
        info!("watching logind session: {session_path}");

        let session = session_proxy(&conn, session_path).await?;
        let remote: bool = session
            .get_property("Remote")
            .await
            .map_err(|e| SessionError::Property(e.to_string()))?;
        debug!("session remote flag: {remote}");

        let active_changes = session.receive_property_changed("Active").await;

        Ok(Self {
            session,
            active_changes,
            remote,
            last_active: None,
        })
    }
}

#[async_trait]
impl SessionSource for LogindSource {
    async fn current_locality(&mut self) -> Result<SessionLocality, SessionError> {
        let active: bool = self
            .session
            .get_property("Active")
            .await
            .map_err(|e| SessionError::Property(e.to_string()))?;
        self.last_active = Some(active);
        Ok(locality_of(active, self.remote))
    }

    async fn next_event(&mut self) -> Result<SessionEvent, SessionError> {
        loop {
            let change = self
                .active_changes
                .next()
                .await
                .ok_or_else(|| SessionError::Property("property stream ended".to_string()))?;

            let active = change
                .get()
                .await
                .map_err(|e| SessionError::Property(e.to_string()))?;

            // Property refreshes without a value change carry no event.
            if self.last_active == Some(active) {
                continue;
            }
            self.last_active = Some(active);

            let event = classify(active, self.remote);
            debug!("logind activity change: active={active} -> {event:?}");
            return Ok(event);
        }
    }
}

async fn session_proxy(
    conn: &Connection,
    path: String,
) -> Result<zbus::Proxy<'static>, SessionError> {
    zbus::Proxy::new(conn, LOGIND_SERVICE, path, SESSION_INTERFACE)
        .await
        .map_err(|e| SessionError::Lookup(e.to_string()))
}

/// Resolve the object path of the current session.
async fn resolve_session_path(conn: &Connection) -> Result<String, SessionError> {
    if let Ok(session_id) = env::var("XDG_SESSION_ID") {
        debug!("resolving session from XDG_SESSION_ID={session_id}");
        return session_by_id(conn, &session_id).await;
    }

    // No session id in the environment; logind aliases the caller's own
    // session under a fixed path.
    let auto_path = format!("{LOGIND_PATH}/session/auto");
    if session_exists(conn, &auto_path).await {
        return Ok(auto_path);
    }

    Err(SessionError::Lookup(
        "could not resolve current session; set XDG_SESSION_ID".to_string(),
    ))
}

/// Look up a session object path via `Manager.GetSession`.
async fn session_by_id(conn: &Connection, session_id: &str) -> Result<String, SessionError> {
    let manager = zbus::Proxy::new(conn, LOGIND_SERVICE, LOGIND_PATH, MANAGER_INTERFACE)
        .await
        .map_err(|e| SessionError::Lookup(e.to_string()))?;

    let path: zbus::zvariant::OwnedObjectPath = manager
        .call("GetSession", &(session_id,))
        .await
        .map_err(|e| SessionError::Lookup(e.to_string()))?;

    Ok(path.to_string())
}

/// Probe a session path by reading a property from it.
async fn session_exists(conn: &Connection, path: &str) -> bool {
    match session_proxy(conn, path.to_string()).await {
        Ok(proxy) => proxy.get_property::<bool>("Active").await.is_ok(),
        Err(_) => false,
    }
}
