//! # Observability
//!
//! Installs a `tracing` subscriber for applications embedding the engine.
//! The engine itself only emits events; worker lifecycle and per-result
//! events are at `debug` level, group progress at `debug`/`info`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum level captured for `helmfleet` events.
    pub level: Level,
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

impl ObservabilityConfig {
    /// Shortcut for debug-level output, which includes per-worker events.
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Defines the output target for logs.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Log to stdout.
    #[default]
    Console,
    /// Log to a file, truncating it first.
    File(String),
}

/// Builds the filter: `RUST_LOG` directives plus `helmfleet=<level>`.
fn build_filter(level: Level) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    Ok(EnvFilter::from_default_env().add_directive(format!("helmfleet={}", level).parse()?))
}

/// Initializes the global tracing subscriber.
///
/// Call once at program start. Fails if a global subscriber is already set
/// or the log file cannot be created.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::registry().with(build_filter(config.level)?);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stdout);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::File::create(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}
