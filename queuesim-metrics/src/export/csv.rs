//! CSV export of experience records
//!
//! Writes one row per customer visit, suitable for spreadsheet analysis and
//! pandas. Unset times are left as empty cells.

use crate::analysis::{ExperienceRecord, SimulationAnalysis};
use crate::error::MetricsError;
use crate::export::AnalysisExporter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER: &str =
    "customer,stage,server,system_arrival,queue_entry,service_entry,service_completion,waiting,system";

#[derive(Debug)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write the records to any writer.
    pub fn write_records<W: Write>(writer: &mut W, records: &[ExperienceRecord]) -> Result<(), MetricsError> {
        writeln!(writer, "{HEADER}")?;
        for r in records {
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{}",
                escape_csv(&r.customer),
                escape_csv(&r.stage),
                r.server.as_deref().map(escape_csv).unwrap_or_default(),
                r.system_arrival,
                r.queue_entry,
                optional(r.service_entry),
                optional(r.service_completion),
                optional(r.waiting),
                optional(r.system),
            )?;
        }
        Ok(())
    }
}

impl AnalysisExporter for CsvExporter {
    fn export(&self, analysis: &SimulationAnalysis) -> Result<(), MetricsError> {
        let mut file = BufWriter::new(File::create(&self.path)?);
        Self::write_records(&mut file, analysis.records())?;
        file.flush()?;
        info!(path = %self.path.display(), rows = analysis.records().len(), "Exported experiences to CSV");
        Ok(())
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Escape CSV special characters
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
