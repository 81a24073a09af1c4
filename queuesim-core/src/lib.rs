//! Core discrete event engine for queueing network simulation.
//!
//! This crate provides the clock, the [`Stage`] capability that every node
//! of a queueing network implements, the customers that flow between stages,
//! the distributions that drive them, and the [`Simulation`] orchestrator.
//!
//! # Architecture Overview
//!
//! - [`Simulation`] owns every registered stage and the global clock. Each
//!   step it asks all stages for their [`NextEvent`], advances the clock to
//!   the earliest one and lets that stage process its event.
//!
//! - [`Stage`] is implemented by sources, queues and exits (see the
//!   `queuesim-components` crate). While a stage processes an event it gets a
//!   [`Network`] through which it hands customers to other stages.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use queuesim_core::{Simulation, SimulationConfig, Executor, SimTime};
//!
//! let mut simulation = Simulation::new(SimulationConfig::new(42));
//! simulation.add_stage(source)?;
//! simulation.add_stage(queue)?;
//! simulation.add_stage(exit)?;
//!
//! simulation.run(Some(SimTime::from_secs(3600)), 10_000);
//! for customer in simulation.customers() {
//!     println!("{} waited {:?}", customer.id(), customer.total_waiting_time());
//! }
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time (not wall-clock time).
//! Ties between stages due at the same instant go to the lowest [`StageId`],
//! so a fixed seed always reproduces the same event sequence.

pub mod config;
pub mod customer;
pub mod dists;
pub mod error;
pub mod execute;
pub mod logging;
pub mod stage;
pub mod time;
pub mod types;

use std::collections::BTreeMap;
use tracing::{debug, info, instrument, trace, warn};

pub use config::SimulationConfig;
pub use customer::{Customer, Experience};
pub use dists::Distribution;
pub use error::{DistributionError, SimError};
pub use execute::{Execute, Executor};
pub use logging::{
    event_span, init_detailed_simulation_logging, init_simulation_logging,
    init_simulation_logging_with_level, simulation_span, stage_span,
};
pub use stage::{EventKind, Network, NextEvent, Stage, StageEvent, StageMap};
pub use time::SimTime;
pub use types::{CustomerId, ServerId, StageId};

/// Head count of every customer a simulation has created.
///
/// Under correct operation `created == in_flight + departed + dropped` holds
/// after every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Census {
    pub created: u64,
    pub in_flight: u64,
    pub departed: u64,
    pub dropped: u64,
}

impl Census {
    pub fn is_balanced(&self) -> bool {
        self.created == self.in_flight + self.departed + self.dropped
    }
}

/// Simulation struct that puts the stages and the clock together.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    config: SimulationConfig,
    stages: StageMap,
    clock: SimTime,
    trials: u64,
    dropped: u64,
    last_event: Option<StageEvent>,
    stalled: BTreeMap<StageId, SimTime>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            stages: StageMap::new(),
            clock: SimTime::zero(),
            trials: 0,
            dropped: 0,
            last_event: None,
            stalled: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock
    }

    /// Number of events processed so far, across all runs.
    #[must_use]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Customers lost because a destination refused them.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The event handled by the most recent step, if it did anything.
    pub fn last_event(&self) -> Option<&StageEvent> {
        self.last_event.as_ref()
    }

    /// Stages left out of event selection because processing their event
    /// changed nothing, with the time they are stuck at. A stage rejoins as
    /// soon as it reports a different event time.
    pub fn stalled_stages(&self) -> impl Iterator<Item = (&StageId, SimTime)> {
        self.stalled.iter().map(|(id, t)| (id, *t))
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_ids(&self) -> impl Iterator<Item = &StageId> {
        self.stages.keys()
    }

    /// Registers a stage. Fails if a stage with the same id is already present.
    #[instrument(skip(self, stage), fields(stage_type = std::any::type_name::<S>()))]
    pub fn add_stage<S: Stage>(&mut self, stage: S) -> Result<(), SimError> {
        self.add_boxed_stage(Box::new(stage))
    }

    pub fn add_boxed_stage(&mut self, stage: Box<dyn Stage>) -> Result<(), SimError> {
        let id = stage.id().clone();
        if self.stages.contains_key(&id) {
            warn!(stage = %id, "Attempted to add duplicate stage");
            return Err(SimError::DuplicateStage { id });
        }
        debug!(stage = %id, valid = stage.is_valid(), "Added stage to simulation");
        self.stages.insert(id, stage);
        Ok(())
    }

    /// Remove a stage: usually at the end of the simulation to peek at the state
    pub fn remove_stage(&mut self, id: &StageId) -> Result<Box<dyn Stage>, SimError> {
        match self.stages.remove(id) {
            Some(stage) => {
                self.stalled.remove(id);
                debug!(stage = %id, "Removed stage from simulation");
                Ok(stage)
            }
            None => {
                warn!(stage = %id, "Attempted to remove non-existent stage");
                Err(SimError::StageNotFound { id: id.clone() })
            }
        }
    }

    /// Typed read access to a registered stage.
    pub fn stage<T: Stage>(&self, id: &StageId) -> Option<&T> {
        self.stages
            .get(id)
            .and_then(|stage| (**stage).as_any().downcast_ref::<T>())
    }

    /// Typed mutable access to a registered stage.
    pub fn stage_mut<T: Stage>(&mut self, id: &StageId) -> Option<&mut T> {
        self.stages
            .get_mut(id)
            .and_then(|stage| (**stage).as_any_mut().downcast_mut::<T>())
    }

    /// The stage due next and its event time. Ties go to the lowest id.
    pub fn peek_next_event(&self) -> Option<(StageId, SimTime)> {
        let mut best: Option<(&StageId, SimTime)> = None;
        for (id, stage) in &self.stages {
            if let NextEvent::At(t) = stage.next_event_time() {
                if self.stalled.get(id) == Some(&t) {
                    continue;
                }
                if best.map_or(true, |(_, bt)| t < bt) {
                    best = Some((id, t));
                }
            }
        }
        best.map(|(id, t)| (id.clone(), t))
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` otherwise, which signifies that the simulation
    /// ended.
    pub fn step(&mut self) -> bool {
        let Some((id, due)) = self.peek_next_event() else {
            return false;
        };
        if due < self.clock {
            warn!(stage = %id, due = %due, clock = %self.clock, "Stage reported an event in the past");
        }
        let now = due.max(self.clock);
        self.clock = now;

        let Some(mut stage) = self.stages.remove(&id) else {
            return false;
        };
        let _span = stage_span(&id).entered();
        let mut network = Network::new(&mut self.stages);
        let event = stage.process_event(now, &mut network);
        let (deferred, dropped) = network.into_parts();
        if event.is_none() && stage.next_event_time() == NextEvent::At(due) {
            warn!(stage = %id, due = %due, clock = %now, "Stage did not advance past its event; excluding it until it reschedules");
            self.stalled.insert(id.clone(), due);
        } else {
            self.stalled.remove(&id);
        }
        self.stages.insert(id.clone(), stage);
        self.dropped += dropped;

        for (dest, customer) in deferred {
            let refused = match self.stages.get_mut(&dest) {
                Some(stage) => stage.accept_arrival(now, customer).err(),
                None => Some(customer),
            };
            if let Some(customer) = refused {
                warn!(stage = %dest, customer = %customer.id(), "Customer dropped: destination refused arrival");
                self.dropped += 1;
            }
        }

        self.trials += 1;
        match &event {
            Some(e) => event_span(&e.stage, e.kind, e.time).in_scope(|| {
                trace!(customer = ?e.customer.as_ref().map(ToString::to_string), "Processed event")
            }),
            None => trace!(stage = %id, time = %now, "Stage had nothing to process"),
        }
        self.last_event = event;
        true
    }

    /// Runs the entire simulation.
    ///
    /// The stopping condition and other execution details depend on the executor used.
    /// See [`Execute`] and [`Executor`] for more details.
    #[instrument(skip(self, executor), fields(initial_time = %self.time()))]
    pub fn execute<E: Execute>(&mut self, executor: E) {
        info!(stages = self.stages.len(), "Starting simulation execution");
        executor.execute(self);
        info!(
            final_time = %self.time(),
            trials = self.trials,
            dropped = self.dropped,
            "Simulation execution completed"
        );
    }

    /// Runs until `max_events` events have been processed in total or the
    /// clock reaches `max_time`, whichever comes first.
    pub fn run(&mut self, max_time: Option<SimTime>, max_events: u64) {
        self.execute(Executor::bounded(max_time, max_events));
    }

    /// Every customer collected by a terminal stage, stage by stage in id
    /// order and in exit order within a stage. Each call starts afresh.
    pub fn customers(&self) -> impl Iterator<Item = &Customer> + '_ {
        self.stages.values().flat_map(|stage| stage.departed().iter())
    }

    /// Count customers by where they currently are.
    pub fn census(&self) -> Census {
        let mut census = Census {
            dropped: self.dropped,
            ..Census::default()
        };
        for stage in self.stages.values() {
            census.created += stage.customers_created();
            census.in_flight += stage.customers_held() as u64;
            census.departed += stage.departed().len() as u64;
        }
        census
    }
}

impl<'a> IntoIterator for &'a Simulation {
    type Item = &'a Customer;
    type IntoIter = Box<dyn Iterator<Item = &'a Customer> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.customers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert {
        id: StageId,
    }

    impl Stage for Inert {
        fn id(&self) -> &StageId {
            &self.id
        }
    }

    struct Collector {
        id: StageId,
        customers: Vec<Customer>,
    }

    impl Stage for Collector {
        fn id(&self) -> &StageId {
            &self.id
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn accept_arrival(&mut self, _now: SimTime, customer: Customer) -> Result<(), Customer> {
            self.customers.push(customer);
            Ok(())
        }

        fn departed(&self) -> &[Customer] {
            &self.customers
        }
    }

    #[test]
    fn default_stage_behaviour() {
        let mut stage = Inert { id: StageId::new("x") };
        assert!(!stage.is_valid());
        assert_eq!(stage.next_event_time(), NextEvent::Never);
        assert_eq!(stage.waiting_count(), None);
        let customer = Customer::new(CustomerId::new(StageId::new("src"), 1), SimTime::zero());
        assert!(stage.accept_arrival(SimTime::zero(), customer).is_err());
    }

    #[test]
    fn add_and_remove_stages() {
        let mut sim = Simulation::default();
        sim.add_stage(Inert { id: StageId::new("a") }).unwrap();
        assert!(matches!(
            sim.add_stage(Inert { id: StageId::new("a") }),
            Err(SimError::DuplicateStage { .. })
        ));
        assert_eq!(sim.num_stages(), 1);

        assert!(sim.stage::<Inert>(&StageId::new("a")).is_some());
        assert!(sim.stage::<Collector>(&StageId::new("a")).is_none());

        assert!(sim.remove_stage(&StageId::new("a")).is_ok());
        assert!(matches!(
            sim.remove_stage(&StageId::new("a")),
            Err(SimError::StageNotFound { .. })
        ));
    }

    #[test]
    fn step_without_events_does_nothing() {
        let mut sim = Simulation::default();
        sim.add_stage(Inert { id: StageId::new("a") }).unwrap();
        assert!(!sim.step());
        sim.run(None, 100);
        assert_eq!(sim.trials(), 0);
        assert_eq!(sim.time(), SimTime::zero());
    }

    /// Reports the same event time forever and never acts on it.
    struct Stuck {
        id: StageId,
        at: SimTime,
    }

    impl Stage for Stuck {
        fn id(&self) -> &StageId {
            &self.id
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn next_event_time(&self) -> NextEvent {
            NextEvent::At(self.at)
        }
    }

    #[test]
    fn stage_that_never_advances_is_set_aside() {
        let mut sim = Simulation::default();
        sim.add_stage(Stuck {
            id: StageId::new("a"),
            at: SimTime::from_secs(5),
        })
        .unwrap();

        sim.execute(Executor::unbound());

        assert_eq!(sim.trials(), 1);
        assert_eq!(sim.time(), SimTime::from_secs(5));
        let stalled: Vec<_> = sim.stalled_stages().collect();
        assert_eq!(stalled, vec![(&StageId::new("a"), SimTime::from_secs(5))]);

        // rescheduling lets it back in
        sim.stage_mut::<Stuck>(&StageId::new("a")).unwrap().at = SimTime::from_secs(9);
        assert_eq!(sim.peek_next_event(), Some((StageId::new("a"), SimTime::from_secs(9))));
        assert!(sim.step());
        assert_eq!(sim.time(), SimTime::from_secs(9));
    }

    #[test]
    fn customers_iterates_sinks_and_restarts() {
        let mut sim = Simulation::default();
        let mut collector = Collector {
            id: StageId::new("exit"),
            customers: Vec::new(),
        };
        for n in 1..=3 {
            let customer = Customer::new(CustomerId::new(StageId::new("src"), n), SimTime::zero());
            collector.accept_arrival(SimTime::zero(), customer).unwrap();
        }
        sim.add_stage(collector).unwrap();
        sim.add_stage(Inert { id: StageId::new("other") }).unwrap();

        assert_eq!(sim.customers().count(), 3);
        let ids: Vec<u64> = (&sim).into_iter().map(|c| c.id().sequence).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let census = sim.census();
        assert_eq!(census.departed, 3);
        assert_eq!(census.created, 0);
    }
}
