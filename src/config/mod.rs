//! Configuration management for the companion widget
//!
//! - **camera**: ConfigStore, the single writer of the camera configuration
//! - **store**: key-value persistence the ConfigStore saves into
//! - **writer**: thread applying config changes requested by agent events

pub mod camera;
pub mod store;
pub mod writer;

// Re-export commonly used types
pub use camera::ConfigStore;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use writer::ConfigWriter;
