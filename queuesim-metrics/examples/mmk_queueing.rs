//! M/M/k queueing comparison
//!
//! Runs the same Poisson arrival stream against one, two and three
//! exponential servers, prints journey summaries and compares each pool
//! against the single server. The three-server run is exported to CSV and
//! JSON in the system temp directory.
//!
//! Run with: cargo run --package queuesim-metrics --example mmk_queueing

use queuesim_components::{EarliestAvailable, Sequential, Server, SimQueue, SourcePopulation, SystemExit};
use queuesim_core::dists::Exponential;
use queuesim_core::{init_simulation_logging, SimTime, Simulation, SimulationConfig};
use queuesim_metrics::export::{export_csv, export_json};
use queuesim_metrics::{compare_performance, SimulationAnalysis};
use std::time::Duration;

/// Parameters of one M/M/k run
#[derive(Debug, Clone)]
struct MmkConfig {
    /// Mean time between arrivals
    interarrival: Duration,
    /// Mean service time per server
    service: Duration,
    servers: usize,
    horizon: SimTime,
    seed: u64,
}

fn build(config: &MmkConfig) -> Result<Simulation, Box<dyn std::error::Error>> {
    let sim_config = SimulationConfig::new(config.seed);

    let mut source = SourcePopulation::new("SP0", Sequential::new()).with_interarrival(Exponential::new(
        config.interarrival,
        sim_config.stream_seed("SP0/arrivals"),
    )?);
    source.add_destination("Q0")?;

    let mut queue = SimQueue::new("Q0", EarliestAvailable, Sequential::new());
    for i in 0..config.servers {
        let id = format!("S{i}");
        let service = Exponential::new(config.service, sim_config.stream_seed(&id))?;
        queue.add_server(Server::new(id, service))?;
    }
    queue.add_destination("EXIT")?;

    let mut sim = Simulation::new(sim_config);
    sim.add_stage(source)?;
    sim.add_stage(queue)?;
    sim.add_stage(SystemExit::new("EXIT"))?;
    Ok(sim)
}

fn run(config: &MmkConfig) -> Result<SimulationAnalysis, Box<dyn std::error::Error>> {
    let mut sim = build(config)?;
    sim.run(Some(config.horizon), u64::MAX);

    let analysis = SimulationAnalysis::new(&sim);
    let summary = analysis.summary()?;
    let census = sim.census();
    println!(
        "M/M/{}: {} done, {} in system | wait mean {:.2}s p90 {:.2}s max {:.2}s | system mean {:.2}s p90 {:.2}s",
        config.servers,
        summary.count,
        census.in_flight,
        summary.mean_waiting,
        summary.p90_waiting,
        summary.max_waiting,
        summary.mean_system,
        summary.p90_system,
    );
    Ok(analysis)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_simulation_logging();
    println!("=== M/M/k Queueing Comparison ===\n");

    let base = MmkConfig {
        interarrival: Duration::from_secs(5),
        service: Duration::from_secs(4),
        servers: 1,
        horizon: SimTime::from_secs(8 * 3600),
        seed: 2024,
    };

    let single = run(&base)?;
    for servers in [2, 3] {
        let analysis = run(&MmkConfig { servers, ..base.clone() })?;
        let cmp = compare_performance(&single, &analysis)?;
        println!(
            "  vs M/M/1: mean wait {:+.2}s, mean system {:+.2}s",
            cmp.mean_waiting_delta, cmp.mean_system_delta
        );

        if servers == 3 {
            let dir = std::env::temp_dir();
            export_csv(&analysis, dir.join("queuesim_mm3.csv"))?;
            export_json(&analysis, dir.join("queuesim_mm3.json"), true)?;
            println!("\nExported M/M/3 experiences to {}", dir.display());
        }
    }

    Ok(())
}
