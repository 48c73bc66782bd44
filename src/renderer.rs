//! Typed command surface of the external avatar renderer
//!
//! Commands are one-way and best-effort. The engine always sends the current
//! derived state, so a dropped command is superseded by the next one.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use tracing::{trace, warn};

use crate::types::{AgentState, CameraConfig, Performance, PresentationMode};

/// One command for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "camelCase")]
pub enum RendererCommand {
    SetPresentationMode(PresentationMode),
    SetChatContent(String),
    SetToolLabel(Option<String>),
    TriggerPerformance(Performance),
    SetAgentState(AgentState),
    UpdateCameraConfig(CameraConfig),
    UpdateMouseOffset { dx: f64, dy: f64 },
    UpdateSize { width: f64, height: f64 },
}

/// Sink for renderer commands (fire-and-forget, safe to call from any task)
pub trait RendererPort: Send + Sync {
    fn send(&self, command: RendererCommand);

    fn set_presentation_mode(&self, mode: PresentationMode) {
        self.send(RendererCommand::SetPresentationMode(mode));
    }

    fn set_chat_content(&self, text: &str) {
        self.send(RendererCommand::SetChatContent(text.to_string()));
    }

    fn set_tool_label(&self, label: Option<&str>) {
        self.send(RendererCommand::SetToolLabel(label.map(str::to_string)));
    }

    fn trigger_performance(&self, performance: &Performance) {
        self.send(RendererCommand::TriggerPerformance(performance.clone()));
    }

    fn set_agent_state(&self, state: AgentState) {
        self.send(RendererCommand::SetAgentState(state));
    }

    fn update_camera_config(&self, config: &CameraConfig) {
        self.send(RendererCommand::UpdateCameraConfig(*config));
    }

    fn update_mouse_offset(&self, dx: f64, dy: f64) {
        self.send(RendererCommand::UpdateMouseOffset { dx, dy });
    }

    fn update_size(&self, width: f64, height: f64) {
        self.send(RendererCommand::UpdateSize { width, height });
    }
}

/// Writes each command as one line of JSON (the host pipes this into the renderer)
pub struct JsonLinesRenderer<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn write_command(&self, command: &RendererCommand) -> Result<()> {
        let line = serde_json::to_string(command).context("Failed to serialize renderer command")?;
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{}", line).context("Failed to write renderer command")?;
        out.flush().context("Failed to flush renderer output")?;
        Ok(())
    }
}

impl JsonLinesRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> RendererPort for JsonLinesRenderer<W> {
    fn send(&self, command: RendererCommand) {
        trace!(command = ?command, "Renderer command");
        if let Err(e) = self.write_command(&command) {
            warn!(error = %e, "Dropped renderer command");
        }
    }
}

/// Discards every command (offline CLI subcommands have no renderer attached)
pub struct NullRenderer;

impl RendererPort for NullRenderer {
    fn send(&self, command: RendererCommand) {
        trace!(command = ?command, "Renderer command discarded");
    }
}

/// In-memory port that records every command (tests only)
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRenderer {
    commands: Mutex<Vec<RendererCommand>>,
}

#[cfg(test)]
impl RecordingRenderer {
    pub fn commands(&self) -> Vec<RendererCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<RendererCommand> {
        std::mem::take(&mut *self.commands.lock().unwrap())
    }

    pub fn count(&self, pred: impl Fn(&RendererCommand) -> bool) -> usize {
        self.commands.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

#[cfg(test)]
impl RendererPort for RecordingRenderer {
    fn send(&self, command: RendererCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Face;

    fn lines(renderer: JsonLinesRenderer<Vec<u8>>) -> Vec<serde_json::Value> {
        let bytes = renderer.out.into_inner().unwrap();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_json_lines_command_shape() {
        let renderer = JsonLinesRenderer::new(Vec::new());
        renderer.set_presentation_mode(PresentationMode::Body);
        renderer.set_tool_label(None);
        renderer.update_mouse_offset(12.5, -3.0);
        renderer.set_agent_state(AgentState::Thinking);

        let out = lines(renderer);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["command"], "setPresentationMode");
        assert_eq!(out[0]["args"], "body");
        assert_eq!(out[1]["command"], "setToolLabel");
        assert!(out[1]["args"].is_null());
        assert_eq!(out[2]["command"], "updateMouseOffset");
        assert_eq!(out[2]["args"]["dx"], 12.5);
        assert_eq!(out[2]["args"]["dy"], -3.0);
        assert_eq!(out[3]["args"], "thinking");
    }

    #[test]
    fn test_content_is_structured_not_interpolated() {
        let renderer = JsonLinesRenderer::new(Vec::new());
        renderer.set_chat_content("it's a \"quote\"\n');alert(1);//");
        let out = lines(renderer);
        assert_eq!(out[0]["command"], "setChatContent");
        assert_eq!(out[0]["args"], "it's a \"quote\"\n');alert(1);//");
    }

    #[test]
    fn test_performance_forwarded_with_wire_names() {
        let renderer = JsonLinesRenderer::new(Vec::new());
        renderer.trigger_performance(&Performance {
            face: Face::Surprise,
            intensity: 0.5,
            action: Some("wave".to_string()),
            audio_url: Some("file:///tmp/a.mp3".to_string()),
            duration: 2.0,
        });
        let out = lines(renderer);
        assert_eq!(out[0]["command"], "triggerPerformance");
        assert_eq!(out[0]["args"]["face"], "surprise");
        assert_eq!(out[0]["args"]["audio_url"], "file:///tmp/a.mp3");
        assert_eq!(out[0]["args"]["duration"], 2.0);
    }
}
