//! The stage capability shared by sources, queues and exits, and the routing
//! context stages use to hand customers to each other.

use crate::customer::Customer;
use crate::time::SimTime;
use crate::types::{CustomerId, StageId};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// When a stage next needs the orchestrator's attention.
///
/// `Never` and `NotApplicable` are kept apart on purpose: a valid stage with
/// nothing pending answers `Never`, a stage that cannot run at all answers
/// `NotApplicable`. Neither is ever selected by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextEvent {
    At(SimTime),
    Never,
    NotApplicable,
}

impl NextEvent {
    pub fn time(&self) -> Option<SimTime> {
        match self {
            NextEvent::At(t) => Some(*t),
            NextEvent::Never | NextEvent::NotApplicable => None,
        }
    }

    /// `At(t)` if `time` is set, `Never` otherwise.
    pub fn from_time(time: Option<SimTime>) -> Self {
        time.map_or(NextEvent::Never, NextEvent::At)
    }
}

/// The kind of event a stage processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Arrival,
    ServiceCompletion,
    ServerDown,
    ServerUp,
}

/// Record of one processed event, as returned by [`Stage::process_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: StageId,
    pub kind: EventKind,
    pub time: SimTime,
    /// Customer created or released by the event, if any.
    pub customer: Option<CustomerId>,
}

/// Upcasting helper so registered stages can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node of the queueing network with its own event schedule.
///
/// The defaults describe an unconfigured stage: invalid, nothing scheduled,
/// every arrival refused and no notion of a waiting line.
pub trait Stage: AsAny {
    fn id(&self) -> &StageId;

    fn is_valid(&self) -> bool {
        false
    }

    fn next_event_time(&self) -> NextEvent {
        NextEvent::Never
    }

    /// Process the event due at `now`. Calls made before the event is due
    /// are ignored and return `None`.
    fn process_event(&mut self, _now: SimTime, _network: &mut Network<'_>) -> Option<StageEvent> {
        None
    }

    /// Take ownership of `customer`, or hand it back if the stage refuses it.
    fn accept_arrival(&mut self, _now: SimTime, customer: Customer) -> Result<(), Customer> {
        Err(customer)
    }

    /// Customers waiting for service; `None` means the notion does not apply.
    fn waiting_count(&self) -> Option<usize> {
        None
    }

    /// Customers currently held anywhere inside the stage.
    fn customers_held(&self) -> usize {
        0
    }

    /// Customers this stage has created since construction.
    fn customers_created(&self) -> u64 {
        0
    }

    /// Customers that finished their journey at this stage, in exit order.
    fn departed(&self) -> &[Customer] {
        &[]
    }
}

pub type StageMap = BTreeMap<StageId, Box<dyn Stage>>;

/// Routing context handed to the stage that is processing an event.
///
/// The processing stage itself is not part of the map while its event runs;
/// customers it routes back to itself are parked and delivered by the
/// orchestrator as soon as the stage is reinstated, within the same event.
pub struct Network<'a> {
    stages: &'a mut StageMap,
    deferred: Vec<(StageId, Customer)>,
    dropped: u64,
}

impl<'a> Network<'a> {
    pub fn new(stages: &'a mut StageMap) -> Self {
        Self {
            stages,
            deferred: Vec::new(),
            dropped: 0,
        }
    }

    /// Waiting count of a registered stage, `None` if unknown or not applicable.
    pub fn waiting_count(&self, id: &StageId) -> Option<usize> {
        self.stages.get(id).and_then(|stage| stage.waiting_count())
    }

    /// Hand `customer` to the stage `dest`. A refused or unroutable customer
    /// is dropped and counted; the return value tells which happened.
    pub fn deliver(&mut self, now: SimTime, dest: &StageId, customer: Customer) -> bool {
        let Some(stage) = self.stages.get_mut(dest) else {
            debug!(dest = %dest, customer = %customer.id(), "Destination not in network, deferring");
            self.deferred.push((dest.clone(), customer));
            return true;
        };
        match stage.accept_arrival(now, customer) {
            Ok(()) => true,
            Err(customer) => {
                self.drop_customer(dest, customer);
                false
            }
        }
    }

    /// Record that `customer` could not be placed anywhere.
    pub fn drop_customer(&mut self, at: &StageId, customer: Customer) {
        warn!(stage = %at, customer = %customer.id(), "Customer dropped: destination refused arrival");
        self.dropped += 1;
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub(crate) fn into_parts(self) -> (Vec<(StageId, Customer)>, u64) {
        (self.deferred, self.dropped)
    }
}
