//! Domain types shared between the control plane, the engine and the renderer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 3D vector used by the camera rig
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Camera placement for one presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSetting {
    pub position: Vec3,
    pub target: Vec3,
    pub fov: f64,
}

/// Camera configuration forwarded to the renderer
/// Field names follow the renderer's camelCase JSON
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    pub head: CameraSetting,
    pub body: CameraSetting,
    pub lerp_speed: f64,
    #[serde(default = "default_follow_mouse")]
    pub follow_mouse: bool,
}

fn default_follow_mouse() -> bool {
    true
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            head: CameraSetting {
                position: Vec3::new(0.0, 1.4, 0.6),
                target: Vec3::new(0.0, 1.4, 0.0),
                fov: 40.0,
            },
            body: CameraSetting {
                position: Vec3::new(0.0, 1.25, 1.3),
                target: Vec3::new(0.0, 1.15, 0.0),
                fov: 35.0,
            },
            lerp_speed: 0.05,
            follow_mouse: default_follow_mouse(),
        }
    }
}

/// Facial expression of a performance cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Joy,
    Angry,
    Sorrow,
    Fun,
    Surprise,
    // Unknown expressions fall back to neutral
    #[serde(other)]
    Neutral,
}

/// Short-lived expressive cue forwarded to the renderer untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub face: Face,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_intensity() -> f64 {
    1.0
}

fn default_duration() -> f64 {
    5.0
}

/// Activity state reported by the agent process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Listening,
    Thinking,
}

impl FromStr for AgentState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentState::Idle),
            "listening" => Ok(AgentState::Listening),
            "thinking" => Ok(AgentState::Thinking),
            other => anyhow::bail!("Unknown agent state '{}'", other),
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Idle => "idle",
            AgentState::Listening => "listening",
            AgentState::Thinking => "thinking",
        };
        f.write_str(name)
    }
}

/// Whether the widget is collapsed or expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationState {
    #[default]
    Closed,
    Expanded,
}

impl PresentationState {
    /// Camera mode the renderer uses for this state
    pub fn mode(self) -> PresentationMode {
        match self {
            PresentationState::Closed => PresentationMode::Head,
            PresentationState::Expanded => PresentationMode::Body,
        }
    }
}

/// Renderer-side name of a presentation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    Head,
    Body,
}
