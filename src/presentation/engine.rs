//! Presentation state machine
//!
//! Owned by the engine actor; every method runs on that single task, so
//! transitions are linearizable without further locking.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::EngineEvent;
use crate::config::ConfigWriter;
use crate::constants::presentation::{
    DISPLAY_DURATION, GREETING, THINKING_LABEL, TYPE_AGENT_STATE, TYPE_ASSISTANT_RESPONSE,
};
use crate::ipc::{Payload, Request};
use crate::renderer::RendererPort;
use crate::types::{AgentState, PresentationState};

/// Lock that suppresses automatic collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    None,
    Hovering,
    GodMode,
}

/// Point-in-time view of the engine (diagnostics and tests)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: PresentationState,
    pub chat_content: String,
    pub tool_label: Option<String>,
    pub override_mode: OverrideMode,
    pub collapse_pending: bool,
}

/// The single scheduled auto-collapse
struct PendingCollapse {
    generation: u64,
    task: JoinHandle<()>,
}

pub struct PresentationEngine {
    state: PresentationState,
    chat_content: String,
    tool_label: Option<String>,
    hovering: bool,
    god_mode: bool,
    pending_collapse: Option<PendingCollapse>,
    generation: u64,
    display_duration: Duration,
    renderer: Arc<dyn RendererPort>,
    config: ConfigWriter,
    events: UnboundedSender<EngineEvent>,
}

impl PresentationEngine {
    pub fn new(
        renderer: Arc<dyn RendererPort>,
        config: ConfigWriter,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            state: PresentationState::Closed,
            chat_content: GREETING.to_string(),
            tool_label: None,
            hovering: false,
            god_mode: false,
            pending_collapse: None,
            generation: 0,
            display_duration: DISPLAY_DURATION,
            renderer,
            config,
            events,
        }
    }

    pub fn override_mode(&self) -> OverrideMode {
        if self.god_mode {
            OverrideMode::GodMode
        } else if self.hovering {
            OverrideMode::Hovering
        } else {
            OverrideMode::None
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state,
            chat_content: self.chat_content.clone(),
            tool_label: self.tool_label.clone(),
            override_mode: self.override_mode(),
            collapse_pending: self.pending_collapse.is_some(),
        }
    }

    /// Re-send the whole derived state (renderer start-up or reconnect)
    pub fn publish(&self) {
        self.renderer.set_presentation_mode(self.state.mode());
        self.renderer.set_chat_content(&self.chat_content);
        self.renderer.set_tool_label(self.tool_label.as_deref());
    }

    pub fn handle_request(&mut self, request: Request) {
        match request.kind.as_str() {
            TYPE_ASSISTANT_RESPONSE => self.on_assistant_response(&request.payload),
            TYPE_AGENT_STATE => self.on_agent_state(&request.payload),
            other => info!(request_type = %other, "Ignoring unknown request type"),
        }

        // Honoured on every request type
        if let Some(follow_mouse) = request.payload.follow_mouse {
            if !self.config.set_follow_mouse(follow_mouse) {
                warn!("Config writer stopped, follow_mouse change dropped");
            }
        }
    }

    fn on_assistant_response(&mut self, payload: &Payload) {
        if let Some(content) = &payload.content {
            self.chat_content = content.clone();
            self.renderer.set_chat_content(content);
            self.apply_state(PresentationState::Expanded);
            self.schedule_auto_collapse();
        }

        match &payload.tool {
            Some(tool) => self.set_tool_label(Some(&tool.name)),
            None => self.set_tool_label(None),
        }

        if let Some(performance) = &payload.performance {
            debug!(face = ?performance.face, "Forwarding performance");
            self.renderer.trigger_performance(performance);
        }
    }

    fn on_agent_state(&mut self, payload: &Payload) {
        let Some(raw) = payload.state.as_deref() else {
            debug!("agent_state request without state");
            return;
        };
        let agent_state = match raw.parse::<AgentState>() {
            Ok(agent_state) => agent_state,
            Err(e) => {
                warn!(error = %e, "Ignoring agent_state");
                return;
            }
        };

        self.renderer.set_agent_state(agent_state);

        match agent_state {
            AgentState::Thinking => {
                self.set_tool_label(Some(THINKING_LABEL));
                // Stay open until the agent goes idle
                self.cancel_auto_collapse();
                self.apply_state(PresentationState::Expanded);
            }
            AgentState::Idle => {
                self.set_tool_label(None);
                if self.override_mode() == OverrideMode::None {
                    self.apply_state(PresentationState::Closed);
                } else {
                    debug!(override_mode = ?self.override_mode(), "Idle collapse suppressed");
                }
            }
            AgentState::Listening => {}
        }
    }

    pub fn hover_started(&mut self) {
        self.cancel_auto_collapse();
        self.hovering = true;
        self.apply_state(PresentationState::Expanded);
    }

    pub fn hover_ended(&mut self) {
        if !self.hovering {
            debug!("Hover end without hover start, ignoring");
            return;
        }
        self.hovering = false;
        if !self.god_mode {
            self.apply_state(PresentationState::Closed);
        }
    }

    pub fn enter_god_mode(&mut self) {
        info!("Entering god mode");
        self.god_mode = true;
        self.cancel_auto_collapse();
        self.apply_state(PresentationState::Expanded);
    }

    pub fn exit_god_mode(&mut self) {
        info!("Exiting god mode");
        self.god_mode = false;
        if !self.hovering {
            self.apply_state(PresentationState::Closed);
        }
    }

    pub fn resized(&self, width: f64, height: f64) {
        self.renderer.update_size(width, height);
    }

    pub fn collapse_timeout(&mut self, generation: u64) {
        let current = self.pending_collapse.as_ref().map(|p| p.generation);
        if current != Some(generation) {
            debug!(generation = generation, current = ?current, "Stale auto-collapse, ignoring");
            return;
        }
        self.pending_collapse = None;

        if self.override_mode() == OverrideMode::None {
            debug!(generation = generation, "Auto-collapse");
            self.apply_state(PresentationState::Closed);
        }
    }

    fn set_tool_label(&mut self, label: Option<&str>) {
        self.tool_label = label.map(str::to_string);
        self.renderer.set_tool_label(label);
    }

    /// Level-triggered: the current mode is always re-sent
    fn apply_state(&mut self, state: PresentationState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Presentation transition");
        }
        if state == PresentationState::Closed {
            self.cancel_auto_collapse();
        }
        self.state = state;
        self.renderer.set_presentation_mode(state.mode());
    }

    fn schedule_auto_collapse(&mut self) {
        self.cancel_auto_collapse();
        if self.override_mode() != OverrideMode::None {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        // Deadline fixed now, not when the task is first polled
        let deadline = Instant::now() + self.display_duration;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // The actor re-checks the generation, so a late send is harmless
            let _ = events.send(EngineEvent::CollapseTimeout { generation });
        });
        self.pending_collapse = Some(PendingCollapse { generation, task });
    }

    fn cancel_auto_collapse(&mut self) {
        if let Some(pending) = self.pending_collapse.take() {
            pending.task.abort();
        }
    }
}

impl Drop for PresentationEngine {
    fn drop(&mut self) {
        self.cancel_auto_collapse();
    }
}
