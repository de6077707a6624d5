//! remote-lockd - daemon that suppresses idle screen locking during remote sessions.
//!
//! Tracks whether the current session is driven locally or over a remote
//! display connection, reflects that state in a status indicator, and arms a
//! periodic suppression action while input is remote.

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use remote_lockd::config::Config;
use remote_lockd::domain::{ControlEvent, MenuCommand};
use remote_lockd::indicator::{LoggingIndicatorHost, StatusReflector};
use remote_lockd::session::{LogindSource, SessionSource};
use remote_lockd::surface::{LoggingMenuHost, SelectionSurface};
use remote_lockd::tracker::{SessionTracker, TrackerError};
use remote_lockd::x11::X11Client;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Well-known bus name of the indicator-area host. A new owner appearing
/// means the indicator area was reset and entries must be re-asserted.
const INDICATOR_HOST_NAME: &str = "org.kde.StatusNotifierWatcher";

/// Remote session screen-lock suppressor.
///
/// Watches session-change notifications and prevents idle-triggered screen
/// locking while the session is driven remotely.
#[derive(Parser, Debug)]
#[command(name = "remote-lockd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable dry-run mode (don't actually run suppression actions).
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print session-change events to stdout.
    #[arg(long)]
    print_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("remote-lockd v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    if args.dry_run {
        config.dry_run = true;
    }

    info!(
        "Configuration loaded (strategy={}, dry_run={})",
        config.default_strategy.as_str(),
        config.dry_run
    );

    run_daemon(config, args.print_events).await
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("remote_lockd={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

/// Run the daemon control loop.
async fn run_daemon(config: Config, print_events: bool) -> Result<()> {
    // Separate connections: a failed injection must not poison policy reads.
    let policy = X11Client::connect().context("Failed to connect to X server (policy)")?;
    let injector = X11Client::connect().context("Failed to connect to X server (input)")?;

    let reflector = StatusReflector::new(Box::new(LoggingIndicatorHost::default()));
    let surface = SelectionSurface::new(Box::new(LoggingMenuHost));
    let mut tracker = SessionTracker::new(
        Box::new(policy),
        Box::new(injector),
        reflector,
        surface,
        config.default_strategy,
        config.dry_run,
    );

    tracker
        .create_indicator()
        .context("Failed to register status indicator")?;
    tracker
        .select_strategy(config.default_strategy)
        .context("Failed to apply initial strategy selection")?;

    let mut source = LogindSource::connect()
        .await
        .context("Failed to connect to logind")?;

    // One query decides the true initial state; notifications may have been
    // missed before the subscription existed.
    let initial = source
        .current_locality()
        .await
        .context("Failed to query current session")?;
    tracker
        .reconcile(initial)
        .context("Failed to reconcile initial session state")?;

    let (tx, mut rx) = mpsc::channel::<ControlEvent>(16);
    spawn_host_reset_watch(tx.clone());
    spawn_shutdown_watch(tx);

    // Suppression interval, rebuilt whenever the armed generation changes.
    let mut timer: Option<(Interval, u64)> = None;

    info!("Daemon started, waiting for session events...");

    loop {
        sync_timer(&tracker, &mut timer);

        tokio::select! {
            event = source.next_event() => {
                match event {
                    Ok(session_event) => {
                        if print_events {
                            println!("[SESSION] {session_event:?}");
                        }
                        if let Err(err) = tracker.handle_event(session_event) {
                            if err.is_fatal() {
                                report_and_shutdown(&mut tracker, &err);
                                return Err(err.into());
                            }
                            warn!("session event handling degraded: {err}");
                        }
                    }
                    Err(err) => {
                        error!("session event error: {err}");
                        source = reconnect_session_source().await?;
                        let current = source
                            .current_locality()
                            .await
                            .context("Failed to re-query session after reconnect")?;
                        if let Err(err) = tracker.reconcile(current) {
                            report_and_shutdown(&mut tracker, &err);
                            return Err(err.into());
                        }
                    }
                }
            }

            Some(control) = rx.recv() => {
                match control {
                    ControlEvent::Menu(MenuCommand::SelectStrategy(strategy)) => {
                        // A rejected selection rolled back; nothing else to do.
                        if let Err(err) = tracker.select_strategy(strategy) {
                            if err.is_fatal() {
                                report_and_shutdown(&mut tracker, &err);
                                return Err(err.into());
                            }
                            warn!("strategy selection rejected: {err}");
                        }
                    }
                    ControlEvent::Menu(MenuCommand::About) => show_about(),
                    ControlEvent::Menu(MenuCommand::Exit) | ControlEvent::Shutdown => break,
                    ControlEvent::IndicatorHostReset => {
                        if let Err(err) = tracker.on_indicator_reset() {
                            if err.is_fatal() {
                                report_and_shutdown(&mut tracker, &err);
                                return Err(err.into());
                            }
                            warn!("indicator re-assertion degraded: {err}");
                        }
                    }
                }
            }

            generation = tick_when_armed(&mut timer) => {
                if let Err(err) = tracker.tick(generation) {
                    report_and_shutdown(&mut tracker, &err);
                    return Err(err.into());
                }
            }
        }
    }

    // Ordered teardown: disarm, remove indicator, release menu, then drop
    // the session subscription.
    tracker.shutdown();
    drop(source);
    info!("remote-lockd stopped");
    Ok(())
}

/// Reconnect the logind source with a short backoff.
async fn reconnect_session_source() -> Result<LogindSource> {
    let mut backoff = Duration::from_millis(250);
    const MAX_BACKOFF: Duration = Duration::from_secs(5);

    loop {
        tokio::time::sleep(backoff).await;
        match LogindSource::connect().await {
            Ok(source) => {
                info!("reconnected to logind");
                return Ok(source);
            }
            Err(err) => {
                warn!("logind reconnect failed: {err}, retrying in {backoff:?}");
                backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
            }
        }
    }
}

/// Keep the suppression interval in step with the tracker's armed state.
fn sync_timer(tracker: &SessionTracker, timer: &mut Option<(Interval, u64)>) {
    match tracker.armed() {
        Some(armed) => {
            let current = timer.as_ref().map(|(_, generation)| *generation);
            if current != Some(armed.generation) {
                // First tick a full period out, not immediately.
                let mut interval =
                    tokio::time::interval_at(Instant::now() + armed.period, armed.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                debug!(
                    "suppression timer scheduled every {:?} (generation {})",
                    armed.period, armed.generation
                );
                *timer = Some((interval, armed.generation));
            }
        }
        None => {
            if timer.take().is_some() {
                debug!("suppression timer cancelled");
            }
        }
    }
}

/// Wait for the next suppression tick, or forever while disarmed.
async fn tick_when_armed(timer: &mut Option<(Interval, u64)>) -> u64 {
    match timer {
        Some((interval, generation)) => {
            interval.tick().await;
            *generation
        }
        None => std::future::pending().await,
    }
}

/// Watch for the indicator host (re)appearing on the session bus.
fn spawn_host_reset_watch(tx: mpsc::Sender<ControlEvent>) {
    tokio::spawn(async move {
        if let Err(err) = watch_host_restart(tx).await {
            warn!("indicator host watch unavailable: {err}");
        }
    });
}

async fn watch_host_restart(tx: mpsc::Sender<ControlEvent>) -> Result<()> {
    let conn = zbus::Connection::session()
        .await
        .context("session bus connection failed")?;
    let dbus = zbus::fdo::DBusProxy::new(&conn)
        .await
        .context("DBus proxy creation failed")?;
    let mut stream = dbus
        .receive_name_owner_changed()
        .await
        .context("NameOwnerChanged subscription failed")?;

    while let Some(signal) = stream.next().await {
        let args = signal.args().context("NameOwnerChanged args")?;
        if args.name().as_str() == INDICATOR_HOST_NAME && args.new_owner().is_some() {
            debug!("indicator host gained an owner");
            if tx.send(ControlEvent::IndicatorHostReset).await.is_err() {
                break;
            }
        }
    }

    Ok(())
}

/// Forward ctrl-c and SIGTERM as a shutdown event.
fn spawn_shutdown_watch(tx: mpsc::Sender<ControlEvent>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(err) => {
                    warn!("SIGTERM handler unavailable: {err}");
                    if ctrl_c.await.is_ok() {
                        let _ = tx.send(ControlEvent::Shutdown).await;
                    }
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
        info!("shutdown requested");
        let _ = tx.send(ControlEvent::Shutdown).await;
    });
}

/// Log the about information; dialog rendering belongs to the shell.
fn show_about() {
    info!(
        "remote-lockd v{} - {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY")
    );
}

/// Single reporting path for fatal errors: log, then tear down in order.
fn report_and_shutdown(tracker: &mut SessionTracker, err: &TrackerError) {
    error!("fatal: {err}");
    tracker.shutdown();
}
