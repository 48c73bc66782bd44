//! POSIX signal surface of the running daemon
//!
//! - `SIGUSR1` / `SIGUSR2`: enter / exit god mode (explicit focus request)
//! - `SIGHUP`: reload the camera config written by another process
//! - `SIGINT` / `SIGTERM`: shut down
//!
//! The daemon records its pid so the CLI can deliver these signals.

use anyhow::{Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;
use std::fs;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::constants::config::{APP_DIR, PID_FILENAME};
use crate::presentation::EngineHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    EnterGodMode,
    ExitGodMode,
    Reload,
    Shutdown,
}

impl ControlSignal {
    fn from_raw(signal: c_int) -> Option<Self> {
        match signal {
            SIGUSR1 => Some(ControlSignal::EnterGodMode),
            SIGUSR2 => Some(ControlSignal::ExitGodMode),
            SIGHUP => Some(ControlSignal::Reload),
            SIGINT | SIGTERM => Some(ControlSignal::Shutdown),
            _ => None,
        }
    }

    fn to_nix(self) -> Signal {
        match self {
            ControlSignal::EnterGodMode => Signal::SIGUSR1,
            ControlSignal::ExitGodMode => Signal::SIGUSR2,
            ControlSignal::Reload => Signal::SIGHUP,
            ControlSignal::Shutdown => Signal::SIGTERM,
        }
    }
}

/// Spawn the signal thread; the returned receiver fires on SIGINT/SIGTERM
pub fn spawn_signal_listener(
    engine: EngineHandle,
    config: Arc<ConfigStore>,
) -> Result<(thread::JoinHandle<()>, oneshot::Receiver<()>)> {
    let mut signals = Signals::new([SIGUSR1, SIGUSR2, SIGHUP, SIGINT, SIGTERM])
        .context("Failed to register signal handlers")?;
    let (shutdown, shutdown_rx) = oneshot::channel();

    let handle = thread::spawn(move || {
        let mut shutdown = Some(shutdown);
        for raw in signals.forever() {
            let Some(signal) = ControlSignal::from_raw(raw) else {
                continue;
            };
            info!(signal = ?signal, "Received signal");
            match signal {
                ControlSignal::EnterGodMode => {
                    engine.enter_god_mode();
                }
                ControlSignal::ExitGodMode => {
                    engine.exit_god_mode();
                }
                ControlSignal::Reload => config.reload(),
                ControlSignal::Shutdown => {
                    if let Some(tx) = shutdown.take() {
                        let _ = tx.send(());
                    }
                    break;
                }
            }
        }
        debug!("Signal listener stopped");
    });
    Ok((handle, shutdown_rx))
}

/// Resolves only on an actual shutdown request
///
/// Without a signal listener (`None`), or once the listener is gone without
/// sending, this never resolves; the default signal dispositions still apply.
pub async fn shutdown_requested(shutdown: Option<oneshot::Receiver<()>>) {
    if let Some(rx) = shutdown {
        if rx.await.is_ok() {
            return;
        }
        warn!("Signal listener exited without a shutdown request");
    }
    std::future::pending::<()>().await
}

/// Pid file location (XDG_RUNTIME_DIR with fallback to cache)
pub fn pid_file_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(APP_DIR).join(PID_FILENAME));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(APP_DIR).join(PID_FILENAME))
}

/// Pid file removed again when dropped
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn create(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create pid directory: {}", parent.display()))?;
        }
        fs::write(&path, std::process::id().to_string())
            .context(format!("Failed to write pid file: {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> Result<Pid> {
    let raw = fs::read_to_string(path)
        .context(format!("Failed to read pid file {} (is the daemon running?)", path.display()))?;
    let pid: i32 = raw
        .trim()
        .parse()
        .context(format!("Invalid pid file contents in {}", path.display()))?;
    Ok(Pid::from_raw(pid))
}

/// Deliver a control signal to the running daemon
pub fn send_to_daemon(path: &Path, signal: ControlSignal) -> Result<()> {
    let pid = read_pid(path)?;
    kill(pid, signal.to_nix()).context(format!("Failed to signal daemon (pid {})", pid))?;
    info!(pid = %pid, signal = ?signal, "Signalled daemon");
    Ok(())
}

/// Like [`send_to_daemon`] but a missing daemon is not an error
pub fn notify_daemon_if_running(path: &Path, signal: ControlSignal) {
    if !path.exists() {
        debug!(path = %path.display(), "No running daemon to notify");
        return;
    }
    if let Err(e) = send_to_daemon(path, signal) {
        warn!(error = ?e, "Could not notify running daemon");
    }
}
