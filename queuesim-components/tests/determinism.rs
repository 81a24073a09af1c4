//! Determinism guardrail tests
//!
//! A five-station network with random inter-arrival, service and breakdown
//! times is run repeatedly from the same seed. The full sequence of
//! `(stage, event kind, time)` must come out identical every time.

use queuesim_components::{
    EarliestAvailable, Sequential, Server, ServerBuilder, ServerState, ShortestQueue, SimQueue,
    SourcePopulation, SystemExit,
};
use queuesim_core::dists::{Exponential, Triangular, Uniform};
use queuesim_core::{EventKind, Executor, SimTime, Simulation, SimulationConfig, StageId};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Trace = Vec<(StageId, EventKind, SimTime)>;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

/// SP0 -> Q0 -> {Q1, Q2} -> EXIT
fn build_network(seed: u64) -> Simulation {
    let config = SimulationConfig::new(seed);

    let mut source = SourcePopulation::new("SP0", Sequential::new())
        .with_interarrival(Exponential::new(secs(4), config.stream_seed("SP0/arrivals")).unwrap());
    source.add_destination("Q0").unwrap();

    let mut q0 = SimQueue::new("Q0", EarliestAvailable, ShortestQueue);
    for id in ["Q0/S0", "Q0/S1"] {
        let service = Triangular::new(secs(2), secs(5), secs(9), config.stream_seed(id)).unwrap();
        q0.add_server(Server::new(id, service)).unwrap();
    }
    q0.add_destination("Q1").unwrap();
    q0.add_destination("Q2").unwrap();

    let mut q1 = SimQueue::new("Q1", Sequential::new(), Sequential::new());
    q1.add_server(Server::new(
        "Q1/S0",
        Exponential::new(secs(6), config.stream_seed("Q1/S0")).unwrap(),
    ))
    .unwrap();
    q1.add_destination("EXIT").unwrap();

    let mut q2 = SimQueue::new("Q2", ShortestQueue, Sequential::new());
    for id in ["Q2/S0", "Q2/S1"] {
        let server = ServerBuilder::new(id)
            .service_time(Uniform::new(secs(3), secs(12), config.stream_seed(id)).unwrap())
            .breakdowns(
                Exponential::new(secs(120), config.stream_seed(&format!("{id}/down"))).unwrap(),
                Exponential::new(secs(15), config.stream_seed(&format!("{id}/repair"))).unwrap(),
            )
            .build()
            .unwrap();
        q2.add_server(server).unwrap();
    }
    q2.add_destination("EXIT").unwrap();

    let mut sim = Simulation::new(config);
    sim.add_stage(source).unwrap();
    sim.add_stage(q0).unwrap();
    sim.add_stage(q1).unwrap();
    sim.add_stage(q2).unwrap();
    sim.add_stage(SystemExit::new("EXIT")).unwrap();
    sim
}

/// Every server is in exactly one regular state, and holds a customer
/// exactly when it is busy.
fn assert_servers_consistent(sim: &Simulation) {
    for queue in ["Q0", "Q1", "Q2"] {
        let queue = sim.stage::<SimQueue>(&StageId::new(queue)).unwrap();
        for server in queue.servers() {
            let state = server.status();
            assert_ne!(state, ServerState::Invalid, "{} at {}", server.id(), sim.time());
            assert_eq!(server.is_busy(), server.customer().is_some(), "{} at {}", server.id(), sim.time());
            assert_eq!(state == ServerState::Busy, server.is_busy());
            assert_eq!(state == ServerState::Available, server.is_available());
        }
    }
}

fn run_traced(seed: u64) -> Trace {
    let mut sim = build_network(seed);
    let trace = Arc::new(Mutex::new(Vec::new()));
    let sink = trace.clone();

    sim.execute(
        Executor::bounded(Some(SimTime::from_secs(3_600)), 20_000).side_effect(move |sim| {
            assert_servers_consistent(sim);
            if let Some(e) = sim.last_event() {
                sink.lock().unwrap().push((e.stage.clone(), e.kind, e.time));
            }
        }),
    );

    let census = sim.census();
    assert!(census.is_balanced(), "{census:?}");
    assert!(census.departed > 0);

    let result = trace.lock().unwrap().clone();
    result
}

#[test]
fn deterministic_event_sequence_across_runs() {
    let baseline = run_traced(42);
    assert!(baseline.len() > 100);

    for _ in 0..10 {
        let next = run_traced(42);
        assert_eq!(baseline, next);
    }
}

#[test]
fn different_seeds_give_different_runs() {
    assert_ne!(run_traced(1), run_traced(2));
}

#[test]
fn breakdowns_show_up_in_trace() {
    let trace = run_traced(7);
    let downs = trace.iter().filter(|(_, kind, _)| *kind == EventKind::ServerDown).count();
    let ups = trace.iter().filter(|(_, kind, _)| *kind == EventKind::ServerUp).count();
    assert!(downs > 0);
    // every repair starts with a down, at most two servers can still be down
    assert!(ups <= downs && downs - ups <= 2);
    assert!(trace
        .iter()
        .filter(|(_, kind, _)| matches!(kind, EventKind::ServerDown | EventKind::ServerUp))
        .all(|(stage, _, _)| stage.as_str() == "Q2"));
}

#[test]
fn server_states_stay_consistent_through_breakdowns() {
    let mut sim = build_network(7);
    let states = Arc::new(Mutex::new(std::collections::HashSet::new()));
    let seen = states.clone();

    sim.execute(Executor::bounded(Some(SimTime::from_secs(3_600)), 20_000).side_effect(move |sim| {
        assert_servers_consistent(sim);
        let q2 = sim.stage::<SimQueue>(&StageId::new("Q2")).unwrap();
        seen.lock().unwrap().extend(q2.servers().map(|s| s.status()));
    }));

    let states = states.lock().unwrap();
    assert!(states.contains(&ServerState::Busy));
    assert!(states.contains(&ServerState::OutOfService));
    assert!(!states.contains(&ServerState::Invalid));
}

#[test]
fn clock_is_monotonic_in_random_network() {
    let trace = run_traced(99);
    assert!(trace.windows(2).all(|w| w[0].2 <= w[1].2));
}
