//! Post-run analysis of customer experiences
//!
//! [`SimulationAnalysis`] flattens the experiences of every customer that
//! left the system into one row per visit, and summarises waiting and
//! system times. Times are reported in seconds.

use crate::error::MetricsError;
use queuesim_core::{Customer, Simulation, StageId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One stage visit of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub customer: String,
    pub stage: String,
    pub server: Option<String>,
    pub system_arrival: f64,
    pub queue_entry: f64,
    pub service_entry: Option<f64>,
    pub service_completion: Option<f64>,
    pub waiting: Option<f64>,
    pub system: Option<f64>,
}

/// Aggregate timings over a set of customers or visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub count: usize,
    pub mean_waiting: f64,
    pub max_waiting: f64,
    pub p90_waiting: f64,
    pub mean_system: f64,
    pub max_system: f64,
    pub p90_system: f64,
}

/// Change from a baseline summary to a candidate; negative is faster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceComparison {
    pub baseline: PerformanceSummary,
    pub candidate: PerformanceSummary,
    pub mean_waiting_delta: f64,
    pub p90_waiting_delta: f64,
    pub mean_system_delta: f64,
    pub p90_system_delta: f64,
}

impl PerformanceComparison {
    /// Whether the candidate moves customers through faster on average.
    pub fn is_improvement(&self) -> bool {
        self.mean_system_delta < 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationAnalysis {
    records: Vec<ExperienceRecord>,
    /// Per-customer (total waiting, total system) in seconds.
    totals: Vec<(f64, f64)>,
}

impl SimulationAnalysis {
    /// Analyse every customer collected by the simulation's exits.
    pub fn new(sim: &Simulation) -> Self {
        Self::from_customers(sim.customers())
    }

    pub fn from_customers<'a>(customers: impl IntoIterator<Item = &'a Customer>) -> Self {
        let mut analysis = Self::default();
        for customer in customers {
            let id = customer.id().to_string();
            let arrival = customer.system_arrival_time().as_secs_f64();
            for exp in customer.experiences() {
                analysis.records.push(ExperienceRecord {
                    customer: id.clone(),
                    stage: exp.stage_id.to_string(),
                    server: exp.server_id.as_ref().map(ToString::to_string),
                    system_arrival: arrival,
                    queue_entry: exp.queue_entry_time.as_secs_f64(),
                    service_entry: exp.service_entry_time.map(|t| t.as_secs_f64()),
                    service_completion: exp.service_completion_time.map(|t| t.as_secs_f64()),
                    waiting: exp.waiting_time.map(|d| d.as_secs_f64()),
                    system: exp.system_time.map(|d| d.as_secs_f64()),
                });
            }
            if let (Some(waiting), Some(system)) = (customer.total_waiting_time(), customer.total_system_time()) {
                analysis.totals.push((waiting.as_secs_f64(), system.as_secs_f64()));
            }
        }
        debug!(records = analysis.records.len(), customers = analysis.totals.len(), "Built simulation analysis");
        analysis
    }

    pub fn records(&self) -> &[ExperienceRecord] {
        &self.records
    }

    /// Summary over whole journeys: each customer's waiting and system time
    /// summed across all the stages it visited.
    pub fn summary(&self) -> Result<PerformanceSummary, MetricsError> {
        summarize(&self.totals)
            .ok_or_else(|| MetricsError::InvalidAnalysis("no completed customers".to_string()))
    }

    /// Summary over the completed visits to one stage.
    pub fn stage_summary(&self, stage: &StageId) -> Result<PerformanceSummary, MetricsError> {
        let visits: Vec<(f64, f64)> = self
            .records
            .iter()
            .filter(|r| r.stage == stage.as_str())
            .filter_map(|r| Some((r.waiting?, r.system?)))
            .collect();
        summarize(&visits)
            .ok_or_else(|| MetricsError::InvalidAnalysis(format!("no completed visits to {stage}")))
    }
}

/// Compare two runs' journey summaries.
pub fn compare_performance(
    baseline: &SimulationAnalysis,
    candidate: &SimulationAnalysis,
) -> Result<PerformanceComparison, MetricsError> {
    let baseline = baseline.summary()?;
    let candidate = candidate.summary()?;
    Ok(PerformanceComparison {
        mean_waiting_delta: candidate.mean_waiting - baseline.mean_waiting,
        p90_waiting_delta: candidate.p90_waiting - baseline.p90_waiting,
        mean_system_delta: candidate.mean_system - baseline.mean_system,
        p90_system_delta: candidate.p90_system - baseline.p90_system,
        baseline,
        candidate,
    })
}

fn summarize(samples: &[(f64, f64)]) -> Option<PerformanceSummary> {
    if samples.is_empty() {
        return None;
    }
    let waiting: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let system: Vec<f64> = samples.iter().map(|s| s.1).collect();
    Some(PerformanceSummary {
        count: samples.len(),
        mean_waiting: mean(&waiting),
        max_waiting: waiting.iter().copied().fold(f64::MIN, f64::max),
        p90_waiting: percentile_higher(&waiting, 90.0),
        mean_system: mean(&system),
        max_system: system.iter().copied().fold(f64::MIN, f64::max),
        p90_system: percentile_higher(&system, 90.0),
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile that never interpolates: the smallest sample at or above the
/// fractional rank `q / 100 * (n - 1)`.
pub fn percentile_higher(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q / 100.0 * (sorted.len() - 1) as f64).ceil() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuesim_core::{CustomerId, ServerId, SimTime};

    fn served(n: u64, arrive: u64, start: u64, end: u64) -> Customer {
        let mut c = Customer::new(CustomerId::new(StageId::new("SP0"), n), SimTime::from_secs(arrive));
        c.log_arrival(SimTime::from_secs(arrive), StageId::new("Q0"));
        c.log_service_entry(SimTime::from_secs(start), ServerId::new("S0"));
        c.log_service_completion(SimTime::from_secs(end));
        c
    }

    #[test]
    fn test_percentile_higher() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        // rank 0.9 * 9 = 8.1 rounds up to index 9
        assert_eq!(percentile_higher(&values, 90.0), 10.0);
        assert_eq!(percentile_higher(&values, 50.0), 6.0);
        assert_eq!(percentile_higher(&[3.0], 90.0), 3.0);
        assert_eq!(percentile_higher(&[], 90.0), 0.0);
    }

    #[test]
    fn test_records_one_row_per_visit() {
        let customers = vec![served(1, 6, 6, 16), served(2, 12, 16, 26)];
        let analysis = SimulationAnalysis::from_customers(&customers);

        assert_eq!(analysis.records().len(), 2);
        let second = &analysis.records()[1];
        assert_eq!(second.customer, "SP0-2");
        assert_eq!(second.server.as_deref(), Some("S0"));
        assert_eq!(second.waiting, Some(4.0));
        assert_eq!(second.system, Some(14.0));
    }

    #[test]
    fn test_summary() {
        let customers = vec![served(1, 6, 6, 16), served(2, 12, 16, 26)];
        let summary = SimulationAnalysis::from_customers(&customers).summary().unwrap();

        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean_waiting, 2.0);
        assert_eq!(summary.max_waiting, 4.0);
        assert_eq!(summary.p90_waiting, 4.0);
        assert_eq!(summary.mean_system, 12.0);
        assert_eq!(summary.max_system, 14.0);
    }

    #[test]
    fn test_empty_analysis_is_an_error() {
        let analysis = SimulationAnalysis::from_customers(&Vec::<Customer>::new());
        assert!(matches!(analysis.summary(), Err(MetricsError::InvalidAnalysis(_))));
        assert!(analysis.stage_summary(&StageId::new("Q0")).is_err());
    }

    #[test]
    fn test_incomplete_customers_are_left_out_of_summary() {
        let mut waiting = Customer::new(CustomerId::new(StageId::new("SP0"), 3), SimTime::from_secs(1));
        waiting.log_arrival(SimTime::from_secs(1), StageId::new("Q0"));
        let customers = vec![served(1, 0, 0, 5), waiting];

        let analysis = SimulationAnalysis::from_customers(&customers);
        assert_eq!(analysis.records().len(), 2);
        assert_eq!(analysis.summary().unwrap().count, 1);
        assert_eq!(analysis.stage_summary(&StageId::new("Q0")).unwrap().count, 1);
    }

    #[test]
    fn test_compare_performance() {
        let slow = SimulationAnalysis::from_customers(&vec![served(1, 0, 5, 15)]);
        let fast = SimulationAnalysis::from_customers(&vec![served(1, 0, 1, 11)]);

        let cmp = compare_performance(&slow, &fast).unwrap();
        assert_eq!(cmp.mean_waiting_delta, -4.0);
        assert_eq!(cmp.mean_system_delta, -4.0);
        assert!(cmp.is_improvement());
        assert!(!compare_performance(&fast, &slow).unwrap().is_improvement());
    }
}
