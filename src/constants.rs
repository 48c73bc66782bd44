//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Local control-plane listener constants
pub mod server {
    /// Default TCP port the agent process pushes events to
    pub const DEFAULT_PORT: u16 = 11451;

    /// Default bind address (loopback only, the channel is unauthenticated)
    pub const DEFAULT_BIND: &str = "127.0.0.1";

    /// Maximum bytes read from a single connection
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

    /// Separator between header block and body in minimal-HTTP framing
    pub const HEADER_TERMINATOR: &str = "\r\n\r\n";

    /// Fixed reply written after every non-empty message
    pub const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
}

/// Presentation state machine constants
pub mod presentation {
    use std::time::Duration;

    /// How long an assistant response stays expanded before auto-collapse
    pub const DISPLAY_DURATION: Duration = Duration::from_secs(5);

    /// Chat content shown before the first assistant response
    pub const GREETING: &str = "Hi! I'm your desktop assistant.";

    /// Tool label shown while the agent reports `thinking`
    pub const THINKING_LABEL: &str = "Thinking...";

    /// Request types understood by the engine
    pub const TYPE_ASSISTANT_RESPONSE: &str = "assistant_response";
    pub const TYPE_AGENT_STATE: &str = "agent_state";
}

/// Pointer sampling constants
pub mod pointer {
    use std::time::Duration;

    /// Sampling cadence (~30 Hz)
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(33);
}

/// Hover watcher constants
pub mod hover {
    use std::time::Duration;

    /// Delay between attempts to locate the widget window
    pub const WINDOW_LOOKUP_RETRY: Duration = Duration::from_secs(1);
}

/// Configuration and persistence constants
pub mod config {
    /// Directory under the XDG config dir
    pub const APP_DIR: &str = "notch-companion";

    /// Key-value state file name
    pub const FILENAME: &str = "state.json";

    /// Store key holding the serialized camera configuration
    pub const CAMERA_CONFIG_KEY: &str = "CameraConfigV1";

    /// Pid file name under the runtime dir (used by `focus` to signal the daemon)
    pub const PID_FILENAME: &str = "notch-companion.pid";
}

/// X11 lookup constants
pub mod x11 {
    /// Default WM_NAME of the widget window hosting the renderer
    pub const DEFAULT_WINDOW_TITLE: &str = "Notch Companion";

    /// Maximum title length fetched per window
    pub const TITLE_MAX_LEN: u32 = 1024;
}
