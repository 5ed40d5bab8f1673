//! Injected logging capability.
//!
//! Components hold an `Arc<dyn Logger>` instead of calling `tracing` macros
//! directly, so tests can swap in a [`NoOpLogger`] or a recording logger and
//! assert on what a component reported.

mod logger;
mod tracing_adapter;

#[cfg(test)]
mod recording;

pub use logger::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;

#[cfg(test)]
pub use logger::NoOpLogger;
#[cfg(test)]
pub use recording::RecordingLogger;
