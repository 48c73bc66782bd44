//! Off-actor writer for camera config changes coming from agent events
//!
//! Saving touches the disk, so the engine hands follow-mouse changes to this
//! thread instead of persisting inline. Writes are applied in arrival order,
//! each one still saved before the renderer is notified.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{debug, info};

use super::camera::ConfigStore;

enum WriteOp {
    FollowMouse(bool),
    Flush(Sender<()>),
}

/// Cloneable handle to the writer thread
#[derive(Clone)]
pub struct ConfigWriter {
    tx: Sender<WriteOp>,
}

impl ConfigWriter {
    /// Start the writer; the thread exits once every handle is dropped
    pub fn spawn(store: Arc<ConfigStore>) -> Result<(Self, thread::JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("config-writer".to_string())
            .spawn(move || {
                for op in rx {
                    match op {
                        WriteOp::FollowMouse(enabled) => {
                            store.set_follow_mouse(enabled);
                        }
                        WriteOp::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("Config writer stopped");
            })
            .context("Failed to spawn config writer thread")?;
        info!("Config writer started");
        Ok((Self { tx }, handle))
    }

    /// Queue a follow-mouse change; false if the writer is gone
    pub fn set_follow_mouse(&self, enabled: bool) -> bool {
        self.tx.send(WriteOp::FollowMouse(enabled)).is_ok()
    }

    /// Block until every change queued before this call has been applied
    pub fn flush(&self) -> bool {
        let (done, wait) = mpsc::channel();
        if self.tx.send(WriteOp::Flush(done)).is_err() {
            return false;
        }
        wait.recv().is_ok()
    }
}
