//! Camera configuration shared between the UI, incoming events and the renderer
//!
//! Every write goes through one lock and is followed by a save and a renderer
//! notification, in that order, before the lock is released.

use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::store::KeyValueStore;
use crate::constants::config::CAMERA_CONFIG_KEY;
use crate::renderer::RendererPort;
use crate::types::CameraConfig;

struct Inner {
    config: CameraConfig,
    store: Box<dyn KeyValueStore>,
}

/// Process-wide owner of the camera configuration
pub struct ConfigStore {
    inner: Mutex<Inner>,
    renderer: Arc<dyn RendererPort>,
}

impl ConfigStore {
    /// Load the persisted config, falling back to the built-in default
    pub fn load(store: Box<dyn KeyValueStore>, renderer: Arc<dyn RendererPort>) -> Self {
        let config = Self::read(store.as_ref()).unwrap_or_else(|| {
            info!("Using built-in default camera config");
            CameraConfig::default()
        });
        Self {
            inner: Mutex::new(Inner { config, store }),
            renderer,
        }
    }

    fn read(store: &dyn KeyValueStore) -> Option<CameraConfig> {
        let raw = match store.get(CAMERA_CONFIG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored camera config");
                return None;
            }
        };
        match serde_json::from_str::<CameraConfig>(&raw) {
            Ok(config) => {
                info!(follow_mouse = config.follow_mouse, "Loaded camera config");
                Some(config)
            }
            Err(e) => {
                warn!(error = %e, "Stored camera config is invalid, ignoring it");
                None
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current config
    pub fn config(&self) -> CameraConfig {
        self.lock().config
    }

    /// Apply `f`, persist and notify the renderer as one unit
    pub fn update(&self, f: impl FnOnce(&mut CameraConfig)) -> CameraConfig {
        let mut inner = self.lock();
        f(&mut inner.config);
        let config = inner.config;
        Self::persist(&mut inner, &config);
        self.renderer.update_camera_config(&config);
        config
    }

    pub fn set_follow_mouse(&self, follow_mouse: bool) -> CameraConfig {
        info!(follow_mouse = follow_mouse, "Updating follow-mouse");
        self.update(|config| config.follow_mouse = follow_mouse)
    }

    /// Restore the built-in default
    pub fn reset(&self) -> CameraConfig {
        info!("Resetting camera config to default");
        self.update(|config| *config = CameraConfig::default())
    }

    /// Re-send the current config to the renderer without persisting
    pub fn publish(&self) {
        let inner = self.lock();
        self.renderer.update_camera_config(&inner.config);
    }

    /// Pick up a config written by another process, then notify the renderer
    pub fn reload(&self) {
        let mut inner = self.lock();
        match Self::read(inner.store.as_ref()) {
            Some(config) => inner.config = config,
            None => warn!("Reload found no usable camera config, keeping current one"),
        }
        self.renderer.update_camera_config(&inner.config);
    }

    fn persist(inner: &mut Inner, config: &CameraConfig) {
        let encoded = match serde_json::to_string(config) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(error = %e, "Failed to encode camera config");
                return;
            }
        };
        if let Err(e) = inner.store.set(CAMERA_CONFIG_KEY, &encoded) {
            error!(error = ?e, "Failed to save camera config");
        }
    }
}
