//! Hover gesture source: pointer enter/leave on the widget window
//!
//! The same event stream also reports widget resizes to the engine.

use anyhow::{Context, Result};
use std::thread;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;

use crate::constants::hover::WINDOW_LOOKUP_RETRY;
use crate::presentation::EngineHandle;
use crate::x11_utils::X11Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Started,
    Ended,
}

/// Collapses raw crossing events into hover start/end edges
#[derive(Debug, Default)]
pub struct HoverTracker {
    inside: bool,
}

impl HoverTracker {
    pub fn enter(&mut self) -> Option<HoverChange> {
        if self.inside {
            return None;
        }
        self.inside = true;
        Some(HoverChange::Started)
    }

    /// `into_child` is a leave into one of the window's own children, which
    /// is still hovering from the user's point of view
    pub fn leave(&mut self, into_child: bool) -> Option<HoverChange> {
        if !self.inside || into_child {
            return None;
        }
        self.inside = false;
        Some(HoverChange::Ended)
    }

    /// Window destroyed or unmapped under the pointer
    pub fn lost(&mut self) -> Option<HoverChange> {
        self.leave(false)
    }
}

fn forward(engine: &EngineHandle, change: Option<HoverChange>) -> bool {
    match change {
        Some(HoverChange::Started) => engine.hover_started(),
        Some(HoverChange::Ended) => engine.hover_ended(),
        None => true,
    }
}

/// Spawn the hover watcher thread (own X11 connection)
pub fn spawn_hover_watcher(title: String, engine: EngineHandle) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = watch(&title, &engine) {
            error!(error = ?e, "Hover watcher stopped");
        }
    })
}

fn watch(title: &str, engine: &EngineHandle) -> Result<()> {
    let session = X11Session::connect()?;
    info!(title = %title, "Hover watcher started");

    loop {
        let window = match session.find_window_by_title(title)? {
            Some(window) => window,
            None => {
                thread::sleep(WINDOW_LOOKUP_RETRY);
                continue;
            }
        };

        if let Err(e) = session
            .conn
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(
                    EventMask::ENTER_WINDOW | EventMask::LEAVE_WINDOW | EventMask::STRUCTURE_NOTIFY,
                ),
            )
            .context(format!("Failed to select crossing events on window {}", window))
            .and_then(|cookie| cookie.check().context("Window vanished before selecting events"))
        {
            warn!(window = window, error = ?e, "Could not watch widget window, retrying");
            thread::sleep(WINDOW_LOOKUP_RETRY);
            continue;
        }
        info!(window = window, "Watching widget window for hover");

        // Renderer viewport follows the widget window size
        match session.viewable_frame(window) {
            Ok(Some(frame)) => {
                engine.resized(frame.width, frame.height);
            }
            Ok(None) => {}
            Err(e) => debug!(window = window, error = ?e, "Initial widget geometry unavailable"),
        }

        let mut tracker = HoverTracker::default();
        loop {
            let event = session
                .conn
                .wait_for_event()
                .context("Failed to wait for X11 event")?;
            let (change, gone) = match event {
                Event::EnterNotify(e) if e.event == window => (tracker.enter(), false),
                Event::LeaveNotify(e) if e.event == window => {
                    (tracker.leave(e.detail == NotifyDetail::INFERIOR), false)
                }
                Event::ConfigureNotify(e) if e.window == window => {
                    engine.resized(e.width as f64, e.height as f64);
                    (None, false)
                }
                Event::UnmapNotify(e) if e.window == window => (tracker.lost(), false),
                Event::DestroyNotify(e) if e.window == window => (tracker.lost(), true),
                _ => (None, false),
            };

            if let Some(change) = change {
                debug!(change = ?change, "Hover change");
            }
            if !forward(engine, change) {
                info!("Presentation engine stopped, hover watcher exiting");
                return Ok(());
            }
            if gone {
                debug!(window = window, "Widget window destroyed, searching again");
                break;
            }
        }
    }
}
