//! Tracing setup with a runtime debug switch.
//!
//! The filter sits behind a `reload` layer so the console can flip between
//! the startup filter and full debug output without restarting.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::domain::{AppError, Result};

const DEBUG_FILTER: &str = "debug";

/// Something that can toggle verbose logging.
pub trait DebugSwitch: Send + Sync {
    /// Flip debug output, returning whether it is now enabled.
    fn toggle_debug(&self) -> Result<bool>;
}

/// Handle to the installed subscriber's filter.
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    base: String,
    debug: AtomicBool,
}

impl LogControl {
    /// Install the global subscriber for the given `-v` count.
    ///
    /// `RUST_LOG` takes precedence over the verbosity flag.
    pub fn init(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let base = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|v| EnvFilter::try_new(v).is_ok())
            .unwrap_or_else(|| level.to_string());

        let (filter, handle) = reload::Layer::new(EnvFilter::new(&base));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).without_time())
            .init();

        Self {
            handle,
            base,
            debug: AtomicBool::new(false),
        }
    }
}

impl DebugSwitch for LogControl {
    fn toggle_debug(&self) -> Result<bool> {
        let enable = !self.debug.load(Ordering::Relaxed);
        let directive = if enable { DEBUG_FILTER } else { self.base.as_str() };

        self.handle
            .reload(EnvFilter::new(directive))
            .map_err(|e| AppError::Config {
                message: format!("Failed to reload log filter: {e}"),
            })?;

        self.debug.store(enable, Ordering::Relaxed);
        Ok(enable)
    }
}
