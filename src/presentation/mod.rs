//! Engine actor: the single serialization point for every presentation input
//!
//! Network requests, hover gestures, override signals and auto-collapse
//! timers are all funneled through one channel into one task.

mod engine;

pub use engine::{EngineSnapshot, PresentationEngine};

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ConfigWriter;
use crate::ipc::Request;
use crate::renderer::RendererPort;

/// Inputs accepted by the engine actor
#[derive(Debug)]
pub enum EngineEvent {
    Request(Request),
    HoverStarted,
    HoverEnded,
    EnterGodMode,
    ExitGodMode,
    Resized { width: f64, height: f64 },
    CollapseTimeout { generation: u64 },
    Publish,
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Shutdown,
}

/// Cloneable sender side of the engine actor
/// Usable from async tasks and from plain threads alike
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    /// Returns false once the actor has stopped
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn submit(&self, request: Request) -> bool {
        self.send(EngineEvent::Request(request))
    }

    pub fn hover_started(&self) -> bool {
        self.send(EngineEvent::HoverStarted)
    }

    pub fn hover_ended(&self) -> bool {
        self.send(EngineEvent::HoverEnded)
    }

    pub fn enter_god_mode(&self) -> bool {
        self.send(EngineEvent::EnterGodMode)
    }

    pub fn exit_god_mode(&self) -> bool {
        self.send(EngineEvent::ExitGodMode)
    }

    pub fn resized(&self, width: f64, height: f64) -> bool {
        self.send(EngineEvent::Resized { width, height })
    }

    pub fn publish(&self) -> bool {
        self.send(EngineEvent::Publish)
    }

    pub fn shutdown(&self) -> bool {
        self.send(EngineEvent::Shutdown)
    }

    /// Current engine state, or None if the actor is gone
    pub async fn snapshot(&self) -> Option<EngineSnapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.send(EngineEvent::Snapshot(reply)) {
            return None;
        }
        rx.await.ok()
    }
}

/// Spawn the engine actor on the current tokio runtime
pub fn spawn_engine(
    renderer: Arc<dyn RendererPort>,
    config: ConfigWriter,
) -> (EngineHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = PresentationEngine::new(renderer, config, tx.clone());
    let task = tokio::spawn(run_engine(engine, rx));
    (EngineHandle { tx }, task)
}

async fn run_engine(mut engine: PresentationEngine, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
    info!("Presentation engine running");

    // The engine keeps a sender for its timers, so the channel never closes on
    // its own; Shutdown ends the loop
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Request(request) => {
                debug!(request_type = %request.kind, "Handling request");
                engine.handle_request(request);
            }
            EngineEvent::HoverStarted => engine.hover_started(),
            EngineEvent::HoverEnded => engine.hover_ended(),
            EngineEvent::EnterGodMode => engine.enter_god_mode(),
            EngineEvent::ExitGodMode => engine.exit_god_mode(),
            EngineEvent::Resized { width, height } => engine.resized(width, height),
            EngineEvent::CollapseTimeout { generation } => engine.collapse_timeout(generation),
            EngineEvent::Publish => engine.publish(),
            EngineEvent::Snapshot(reply) => {
                let _ = reply.send(engine.snapshot());
            }
            EngineEvent::Shutdown => break,
        }
    }

    info!("Presentation engine stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::engine::OverrideMode;
    use crate::config::{ConfigStore, MemoryStore};
    use crate::ipc::decode;
    use crate::renderer::{RecordingRenderer, RendererCommand};
    use crate::types::{PresentationMode, PresentationState};
    use std::time::Duration;

    fn spawn_test_engine() -> (EngineHandle, JoinHandle<()>, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let config = Arc::new(ConfigStore::load(Box::new(MemoryStore::default()), renderer.clone()));
        let (writer, _thread) = ConfigWriter::spawn(config).unwrap();
        let (handle, task) = spawn_engine(renderer.clone(), writer);
        (handle, task, renderer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_end_to_end_auto_collapse() {
        let (handle, _task, _renderer) = spawn_test_engine();
        let request = decode(
            br#"{"type":"assistant_response","payload":{"content":"hi","tool_info":{"name":"search"}}}"#,
        )
        .unwrap();
        handle.submit(request);

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, PresentationState::Expanded);
        assert_eq!(snap.chat_content, "hi");
        assert_eq!(snap.tool_label.as_deref(), Some("search"));

        tokio::time::sleep(Duration::from_millis(4990)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, PresentationState::Expanded);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, PresentationState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_hover_from_thread() {
        let (handle, _task, renderer) = spawn_test_engine();

        let sender = handle.clone();
        std::thread::spawn(move || {
            sender.hover_started();
        })
        .join()
        .unwrap();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, PresentationState::Expanded);
        assert_eq!(snap.override_mode, OverrideMode::Hovering);
        assert_eq!(
            renderer.commands(),
            vec![RendererCommand::SetPresentationMode(PresentationMode::Body)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_resize_forwarded() {
        let (handle, _task, renderer) = spawn_test_engine();
        handle.resized(150.0, 158.0);
        handle.snapshot().await.unwrap();
        assert_eq!(
            renderer.commands(),
            vec![RendererCommand::UpdateSize { width: 150.0, height: 158.0 }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_shutdown() {
        let (handle, task, _renderer) = spawn_test_engine();
        handle.submit(
            decode(br#"{"type":"assistant_response","payload":{"content":"bye"}}"#).unwrap(),
        );
        handle.shutdown();
        task.await.unwrap();

        assert!(!handle.hover_started());
        assert!(handle.snapshot().await.is_none());
    }
}
