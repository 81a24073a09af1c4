//! Export functionality for analysed simulation results
//!
//! This module writes [`SimulationAnalysis`] results to files for external
//! tools: one row per customer visit as CSV, or records plus summary as JSON.

pub mod csv;
pub mod json;

use crate::analysis::SimulationAnalysis;
use crate::error::MetricsError;
use std::path::Path;

/// Trait for exporting analysis results to different formats
pub trait AnalysisExporter {
    /// Export the analysis to the configured destination
    fn export(&self, analysis: &SimulationAnalysis) -> Result<(), MetricsError>;
}

/// Export experience records and summary to JSON
///
/// # Example
/// ```no_run
/// use queuesim_metrics::SimulationAnalysis;
/// use queuesim_metrics::export::export_json;
///
/// let analysis = SimulationAnalysis::default();
/// export_json(&analysis, "results/experiences.json", true).unwrap();
/// ```
pub fn export_json(
    analysis: &SimulationAnalysis,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    json::JsonExporter::new(path.as_ref(), pretty).export(analysis)
}

/// Export experience records to CSV
///
/// # Example
/// ```no_run
/// use queuesim_metrics::SimulationAnalysis;
/// use queuesim_metrics::export::export_csv;
///
/// let analysis = SimulationAnalysis::default();
/// export_csv(&analysis, "results/experiences.csv").unwrap();
/// ```
pub fn export_csv(analysis: &SimulationAnalysis, path: impl AsRef<Path>) -> Result<(), MetricsError> {
    csv::CsvExporter::new(path.as_ref()).export(analysis)
}
