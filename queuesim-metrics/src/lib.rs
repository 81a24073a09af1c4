//! Result analysis and observability for queueing simulations
//!
//! This crate sits on top of a finished (or paused) run: it turns the
//! customers collected by exits into per-visit records and summaries,
//! collects the `metrics` counters components emit, and exports results
//! to CSV or JSON. Nothing here feeds back into the engine.

pub mod analysis;
pub mod error;
pub mod export;
pub mod recorder;

pub use analysis::{
    compare_performance, percentile_higher, ExperienceRecord, PerformanceComparison,
    PerformanceSummary, SimulationAnalysis,
};
pub use error::MetricsError;
pub use recorder::{with_recorded_metrics, RecordedMetrics, SimulationRecorder};
