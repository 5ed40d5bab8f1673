use std::fmt::Arguments;

use crate::log::{LogLevel, Logger};

/// Logger that delegates to the `tracing` crate.
///
/// `tracing` has no success level, so successes are emitted at `info` with an
/// `outcome` field that the console and file layers both keep.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", args),
            LogLevel::Debug => tracing::debug!("{}", args),
            LogLevel::Info => tracing::info!("{}", args),
            LogLevel::Success => tracing::info!(outcome = "success", "{}", args),
            LogLevel::Warn => tracing::warn!("{}", args),
            LogLevel::Error => tracing::error!("{}", args),
        }
    }
}
