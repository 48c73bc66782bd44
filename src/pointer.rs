//! Pointer sampler: feeds the avatar's look-at offset at a fixed cadence
//!
//! Runs on its own thread and shares nothing with the presentation engine
//! except the renderer port.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::renderer::RendererPort;

/// Widget window geometry in root coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowFrame {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Offset of a root-space point from the centre, y pointing up
    pub fn offset_of(&self, px: f64, py: f64) -> (f64, f64) {
        let (cx, cy) = self.center();
        (px - cx, cy - py)
    }
}

/// Host windowing system access used by the sampler
pub trait PointerSource: Send {
    /// Global pointer position in root coordinates
    fn pointer_position(&mut self) -> Result<(f64, f64)>;

    /// Widget frame, or None while the window is absent or not viewable
    fn widget_frame(&mut self) -> Result<Option<WindowFrame>>;
}

pub struct PointerSampler<S: PointerSource> {
    source: S,
    renderer: Arc<dyn RendererPort>,
    interval: Duration,
}

impl<S: PointerSource + 'static> PointerSampler<S> {
    pub fn new(source: S, renderer: Arc<dyn RendererPort>, interval: Duration) -> Self {
        Self {
            source,
            renderer,
            interval,
        }
    }

    /// One tick; returns whether an offset was sent
    pub fn sample_once(&mut self) -> bool {
        let frame = match self.source.widget_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return false,
            Err(e) => {
                trace!(error = ?e, "Widget frame unavailable");
                return false;
            }
        };
        let (px, py) = match self.source.pointer_position() {
            Ok(position) => position,
            Err(e) => {
                trace!(error = ?e, "Pointer position unavailable");
                return false;
            }
        };

        let (dx, dy) = frame.offset_of(px, py);
        self.renderer.update_mouse_offset(dx, dy);
        true
    }

    /// Spawn the sampling loop; it stops once `stop` is set
    pub fn spawn(mut self, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            info!(interval_ms = self.interval.as_millis() as u64, "Pointer sampler started");
            let mut next = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                self.sample_once();

                next += self.interval;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    // Fell behind (suspend, slow X server): skip missed ticks
                    next = now;
                }
            }
            debug!("Pointer sampler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RecordingRenderer, RendererCommand};

    struct FakeSource {
        pointer: (f64, f64),
        frame: Option<WindowFrame>,
        fail_frame: bool,
    }

    impl PointerSource for FakeSource {
        fn pointer_position(&mut self) -> Result<(f64, f64)> {
            Ok(self.pointer)
        }

        fn widget_frame(&mut self) -> Result<Option<WindowFrame>> {
            if self.fail_frame {
                anyhow::bail!("window went away");
            }
            Ok(self.frame)
        }
    }

    fn frame() -> WindowFrame {
        WindowFrame {
            x: 100.0,
            y: 0.0,
            width: 400.0,
            height: 200.0,
        }
    }

    #[test]
    fn test_offset_from_center_y_up() {
        let f = frame();
        assert_eq!(f.center(), (300.0, 100.0));
        // Pointer left of and below the centre
        assert_eq!(f.offset_of(250.0, 160.0), (-50.0, -60.0));
        assert_eq!(f.offset_of(300.0, 100.0), (0.0, 0.0));
    }

    #[test]
    fn test_sample_sends_offset() {
        let renderer = Arc::new(RecordingRenderer::default());
        let source = FakeSource {
            pointer: (700.0, 20.0),
            frame: Some(frame()),
            fail_frame: false,
        };
        let mut sampler = PointerSampler::new(source, renderer.clone(), Duration::from_millis(33));

        assert!(sampler.sample_once());
        assert_eq!(
            renderer.commands(),
            vec![RendererCommand::UpdateMouseOffset { dx: 400.0, dy: 80.0 }]
        );
    }

    #[test]
    fn test_sample_skips_without_window() {
        let renderer = Arc::new(RecordingRenderer::default());
        let source = FakeSource {
            pointer: (1.0, 1.0),
            frame: None,
            fail_frame: false,
        };
        let mut sampler = PointerSampler::new(source, renderer.clone(), Duration::from_millis(33));
        assert!(!sampler.sample_once());
        assert!(renderer.commands().is_empty());
    }

    #[test]
    fn test_sample_skips_on_source_error() {
        let renderer = Arc::new(RecordingRenderer::default());
        let source = FakeSource {
            pointer: (1.0, 1.0),
            frame: Some(frame()),
            fail_frame: true,
        };
        let mut sampler = PointerSampler::new(source, renderer.clone(), Duration::from_millis(33));
        assert!(!sampler.sample_once());
        assert!(renderer.commands().is_empty());
    }

    #[test]
    fn test_spawned_loop_stops() {
        let renderer = Arc::new(RecordingRenderer::default());
        let source = FakeSource {
            pointer: (300.0, 100.0),
            frame: Some(frame()),
            fail_frame: false,
        };
        let stop = Arc::new(AtomicBool::new(false));
        let handle = PointerSampler::new(source, renderer.clone(), Duration::from_millis(5))
            .spawn(stop.clone());

        thread::sleep(Duration::from_millis(60));
        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        let sent = renderer.count(|c| matches!(c, RendererCommand::UpdateMouseOffset { .. }));
        assert!(sent >= 2, "sent {sent}");
    }
}
