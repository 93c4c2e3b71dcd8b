//! Shared infrastructure for the sidecar's middleware crates.
//!
//! This crate provides:
//! - [`tasks`]: the background-task supervisor (§4.5 `BackgroundTasks`)
//! - [`events`]: a small observability event system used by the rate
//!   limiter, cache, and peer-sync crates

pub mod events;
pub mod tasks;

pub use events::{EventListener, SidecarEvent};
pub use tasks::TaskSupervisor;
