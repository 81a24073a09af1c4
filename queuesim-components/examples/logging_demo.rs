//! Demonstration of logging in a small queueing network
//!
//! Every processed event is traced; server state changes and routing are
//! logged at debug level. Override the defaults with RUST_LOG, for example:
//!
//! ```bash
//! RUST_LOG=queuesim_components=debug cargo run --package queuesim-components --example logging_demo
//! ```

use queuesim_components::{Sequential, Server, ServerBuilder, SimQueue, SourcePopulation, SystemExit};
use queuesim_core::dists::{Constant, Sequence};
use queuesim_core::{
    init_detailed_simulation_logging, simulation_span, Executor, SimTime, Simulation, StageId,
};
use std::time::Duration;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_detailed_simulation_logging();
    let _span = simulation_span("logging_demo").entered();

    let secs = Duration::from_secs;
    let mut sim = Simulation::default();

    let arrivals = Sequence::cycle(vec![secs(2), secs(5), secs(3)])?;
    let mut source = SourcePopulation::new("SP0", Sequential::new()).with_interarrival(arrivals);
    source.add_destination("Q0")?;

    let mut queue = SimQueue::new("Q0", Sequential::new(), Sequential::new());
    queue.add_server(Server::new("S0", Constant::new(secs(6))))?;
    queue.add_server(
        ServerBuilder::new("S1")
            .service_time(Constant::new(secs(4)))
            .breakdowns(Constant::new(secs(20)), Constant::new(secs(7)))
            .build()?,
    )?;
    queue.add_destination("EXIT")?;

    sim.add_stage(source)?;
    sim.add_stage(queue)?;
    sim.add_stage(SystemExit::new("EXIT"))?;

    sim.execute(Executor::timed(SimTime::from_secs(60)));

    let exit = sim
        .stage::<SystemExit>(&StageId::new("EXIT"))
        .ok_or("exit stage missing")?;
    for customer in exit {
        info!(
            customer = %customer.id(),
            waited = ?customer.total_waiting_time(),
            in_system = ?customer.total_system_time(),
            "Completed journey"
        );
    }
    info!(census = ?sim.census(), "Done");
    Ok(())
}
