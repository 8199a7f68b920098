//! sbar: an event-driven status line for Linux
//!
//! This library wires the field assembler to the outside world:
//! - Notification file watching for dirty-set updates
//! - Publishing finished status lines
//! - The runner's control loop
//! - Configuration management

pub mod config;
pub mod publisher;
pub mod runner;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use publisher::{Publisher, StdoutPublisher};
pub use runner::StatusRunner;
pub use watcher::{send_notification, NotificationWatcher};
