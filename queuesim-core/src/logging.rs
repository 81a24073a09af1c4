//! Structured logging for queueing simulations
//!
//! The engine logs through `tracing`; nothing is printed unless a subscriber
//! is installed. The helpers here install a `tracing-subscriber` formatter
//! with sensible per-crate defaults.
//!
//! # Controlling output
//!
//! ```rust,ignore
//! use queuesim_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` always wins over the built-in defaults:
//!
//! ```bash
//! RUST_LOG=queuesim_core=trace,queuesim_components=debug cargo test
//! ```
//!
//! # Log level guidelines
//! - **TRACE**: every processed event (stage, kind, time, customer)
//! - **DEBUG**: server state transitions, routing decisions, stage registration
//! - **INFO**: run start and completion
//! - **WARN**: contract violations and dropped customers

use crate::{EventKind, SimTime, StageId};
use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info` level.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("queuesim_core={level},queuesim_components={level},queuesim_metrics={level}").into()
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Initialize very verbose, pretty-printed logging for debugging a model.
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "queuesim_core=trace,queuesim_components=trace,queuesim_metrics=debug".into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

/// Create a span for tracking one simulation run
pub fn simulation_span(name: &str) -> Span {
    tracing::info_span!("simulation", name = name)
}

/// Create a span for work done on behalf of one stage
pub fn stage_span(stage: &StageId) -> Span {
    tracing::debug_span!("stage", id = %stage)
}

/// Create a span for processing one event
pub fn event_span(stage: &StageId, kind: EventKind, time: SimTime) -> Span {
    tracing::trace_span!("event", stage = %stage, kind = ?kind, time = %time)
}
