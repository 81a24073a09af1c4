//! JSON export of experience records and their summary

use crate::analysis::{ExperienceRecord, PerformanceSummary, SimulationAnalysis};
use crate::error::MetricsError;
use crate::export::AnalysisExporter;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct JsonExporter {
    path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn new(path: &Path, pretty: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            pretty,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportData<'a> {
    /// Absent when no customer completed its journey.
    summary: Option<PerformanceSummary>,
    records: &'a [ExperienceRecord],
}

/// Serialize an analysis the way [`JsonExporter`] writes it.
pub fn to_json(analysis: &SimulationAnalysis, pretty: bool) -> Result<String, MetricsError> {
    let data = ExportData {
        summary: analysis.summary().ok(),
        records: analysis.records(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&data)?
    } else {
        serde_json::to_string(&data)?
    };
    Ok(json)
}

impl AnalysisExporter for JsonExporter {
    fn export(&self, analysis: &SimulationAnalysis) -> Result<(), MetricsError> {
        let json = to_json(analysis, self.pretty)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        info!(path = %self.path.display(), "Exported experiences to JSON");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuesim_core::{Customer, CustomerId, ServerId, SimTime, StageId};

    fn analysis() -> SimulationAnalysis {
        let mut c = Customer::new(CustomerId::new(StageId::new("SP0"), 1), SimTime::from_secs(6));
        c.log_arrival(SimTime::from_secs(6), StageId::new("Q0"));
        c.log_service_entry(SimTime::from_secs(6), ServerId::new("S0"));
        c.log_service_completion(SimTime::from_secs(16));
        SimulationAnalysis::from_customers(&[c])
    }

    #[test]
    fn test_json_contains_records_and_summary() {
        let json = to_json(&analysis(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["records"][0]["customer"], "SP0-1");
        assert_eq!(value["records"][0]["server"], "S0");
        assert_eq!(value["records"][0]["system"], 10.0);
        assert_eq!(value["summary"]["count"], 1);
    }

    #[test]
    fn test_empty_analysis_has_null_summary() {
        let json = to_json(&SimulationAnalysis::default(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["summary"].is_null());
        assert_eq!(value["records"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_json_export_to_file() {
        let path = std::env::temp_dir().join("queuesim_test_experiences.json");
        JsonExporter::new(&path, true).export(&analysis()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"SP0-1\""));
        let _ = std::fs::remove_file(&path);
    }
}
