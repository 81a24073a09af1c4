//! Single service unit with an optional breakdown model.
//!
//! A server holds at most one customer. Its lifecycle:
//!
//! ```text
//!            accept                    complete (no down due)
//! Available ────────▶ Busy ────────────────────────────▶ Available
//!     │                 │ complete (down time reached)
//!     │ down            ▼
//!     │            PendingOutOfService
//!     │                 │ down (at the completion instant)
//!     ▼                 ▼
//! OutOfService ◀────────┘
//!     │ up
//!     ▼
//! Available
//! ```
//!
//! Only the owning queue drives a server; the kind of its next event is
//! derived from the current state rather than stored.

use queuesim_core::{Customer, Distribution, EventKind, NextEvent, ServerId, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Externally visible server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerState {
    Available,
    Busy,
    OutOfService,
    PendingOutOfService,
    /// A bound distribution can no longer produce values.
    Invalid,
}

impl ServerState {
    fn label(self) -> &'static str {
        match self {
            ServerState::Available => "available",
            ServerState::Busy => "busy",
            ServerState::OutOfService => "out_of_service",
            ServerState::PendingOutOfService => "pending_out_of_service",
            ServerState::Invalid => "invalid",
        }
    }
}

enum Phase {
    Available,
    Busy(Customer),
    PendingOutOfService,
    OutOfService,
}

pub(crate) struct Breakdowns {
    pub(crate) time_to_down: Box<dyn Distribution>,
    pub(crate) repair: Box<dyn Distribution>,
}

pub struct Server {
    id: ServerId,
    service: Box<dyn Distribution>,
    breakdowns: Option<Breakdowns>,
    phase: Phase,
    next_event: Option<SimTime>,
    next_down: Option<SimTime>,
    available_since: Option<SimTime>,
    served: u64,
}

impl Server {
    /// A server that never breaks down, available from time zero.
    pub fn new(id: impl Into<String>, service: impl Distribution + 'static) -> Self {
        Self::from_parts(ServerId::new(id), Box::new(service), None, SimTime::zero())
    }

    pub(crate) fn from_parts(
        id: ServerId,
        service: Box<dyn Distribution>,
        mut breakdowns: Option<Breakdowns>,
        start: SimTime,
    ) -> Self {
        let next_down = breakdowns
            .as_mut()
            .and_then(|b| b.time_to_down.draw())
            .map(|offset| start + offset);
        Self {
            id,
            service,
            breakdowns,
            phase: Phase::Available,
            next_event: next_down,
            next_down,
            available_since: Some(start),
            served: 0,
        }
    }

    pub fn id(&self) -> &ServerId {
        &self.id
    }

    pub fn status(&self) -> ServerState {
        let breakdowns_valid = self
            .breakdowns
            .as_ref()
            .map_or(true, |b| b.time_to_down.is_valid() && b.repair.is_valid());
        if !self.service.is_valid() || !breakdowns_valid {
            return ServerState::Invalid;
        }
        match self.phase {
            Phase::Available => ServerState::Available,
            Phase::Busy(_) => ServerState::Busy,
            Phase::PendingOutOfService => ServerState::PendingOutOfService,
            Phase::OutOfService => ServerState::OutOfService,
        }
    }

    /// Whether the server can take a customer right now.
    pub fn is_available(&self) -> bool {
        matches!(self.phase, Phase::Available)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Busy(_))
    }

    /// Customer currently in service.
    pub fn customer(&self) -> Option<&Customer> {
        match &self.phase {
            Phase::Busy(customer) => Some(customer),
            _ => None,
        }
    }

    /// Time the server last became available; `None` unless available.
    pub fn available_since(&self) -> Option<SimTime> {
        self.available_since
    }

    /// Customers whose service this server has completed.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub fn next_down_time(&self) -> Option<SimTime> {
        self.next_down
    }

    pub fn next_event_time(&self) -> NextEvent {
        NextEvent::from_time(self.next_event)
    }

    /// Kind of the event at [`Server::next_event_time`], if one is scheduled.
    pub fn next_event_kind(&self) -> Option<EventKind> {
        self.next_event?;
        Some(match self.phase {
            Phase::Busy(_) => EventKind::ServiceCompletion,
            Phase::Available | Phase::PendingOutOfService => EventKind::ServerDown,
            Phase::OutOfService => EventKind::ServerUp,
        })
    }

    /// Start serving `customer` at `now`. The customer is handed back if the
    /// server is not available or cannot draw a service time.
    pub fn accept_customer(&mut self, now: SimTime, mut customer: Customer) -> Result<(), Customer> {
        if !self.is_available() {
            warn!(server = %self.id, customer = %customer.id(), state = ?self.status(), "Server refused customer: not available");
            return Err(customer);
        }
        let Some(service) = self.service.draw() else {
            warn!(server = %self.id, customer = %customer.id(), "Server refused customer: service time distribution is exhausted");
            return Err(customer);
        };

        customer.log_service_entry(now, self.id.clone());
        debug!(server = %self.id, customer = %customer.id(), completes = %(now + service), "Service started");
        self.next_event = Some(now + service);
        self.available_since = None;
        self.phase = Phase::Busy(customer);
        self.record_transition();
        Ok(())
    }

    /// Execute the event due at `now`. Returns the customer whose service
    /// just completed, if that was the event. Nothing happens before the
    /// event is due.
    pub fn process_event(&mut self, now: SimTime) -> Option<Customer> {
        let due = self.next_event?;
        if now < due {
            warn!(server = %self.id, %now, %due, "Server event processed before it is due, ignoring");
            return None;
        }

        match std::mem::replace(&mut self.phase, Phase::Available) {
            Phase::Busy(customer) => Some(self.complete_service(now, customer)),
            Phase::Available | Phase::PendingOutOfService => {
                self.go_down(now);
                None
            }
            Phase::OutOfService => {
                self.come_up(now);
                None
            }
        }
    }

    /// Schedule the server to go down at `at`. Only an available or busy
    /// server accepts this; a busy server finishes its customer first.
    pub fn pause_service(&mut self, at: SimTime) -> bool {
        match self.phase {
            Phase::Available => {
                self.next_down = Some(at);
                self.next_event = Some(at);
                true
            }
            Phase::Busy(_) => {
                self.next_down = Some(at);
                true
            }
            Phase::PendingOutOfService | Phase::OutOfService => false,
        }
    }

    /// Reschedule the return of an out-of-service server to `at`.
    pub fn resume_service(&mut self, at: SimTime) -> bool {
        match self.phase {
            Phase::OutOfService => {
                self.next_event = Some(at);
                true
            }
            _ => false,
        }
    }

    fn complete_service(&mut self, now: SimTime, mut customer: Customer) -> Customer {
        customer.log_service_completion(now);
        self.served += 1;

        if self.next_down.is_some_and(|down| down <= now) {
            // the down event fires at this same instant
            self.phase = Phase::PendingOutOfService;
            self.next_event = Some(now);
        } else {
            if self.next_down.is_none() {
                self.next_down = self.draw_time_to_down().map(|offset| now + offset);
            }
            self.phase = Phase::Available;
            self.available_since = Some(now);
            self.next_event = self.next_down;
        }
        debug!(server = %self.id, customer = %customer.id(), %now, state = ?self.status(), "Service completed");
        self.record_transition();
        customer
    }

    fn go_down(&mut self, now: SimTime) {
        self.phase = Phase::OutOfService;
        self.available_since = None;
        self.next_down = None;
        self.next_event = match self.breakdowns.as_mut() {
            Some(b) => {
                let repair = b.repair.draw();
                if repair.is_none() {
                    warn!(server = %self.id, "Repair time distribution is exhausted; server stays down");
                }
                repair.map(|d| now + d)
            }
            // Manually paused: stays down until resumed
            None => None,
        };
        debug!(server = %self.id, %now, up_at = ?self.next_event, "Server down");
        self.record_transition();
    }

    fn come_up(&mut self, now: SimTime) {
        self.phase = Phase::Available;
        self.available_since = Some(now);
        self.next_down = self.draw_time_to_down().map(|offset| now + offset);
        self.next_event = self.next_down;
        debug!(server = %self.id, %now, down_at = ?self.next_down, "Server up");
        self.record_transition();
    }

    fn draw_time_to_down(&mut self) -> Option<std::time::Duration> {
        self.breakdowns.as_mut().and_then(|b| b.time_to_down.draw())
    }

    fn record_transition(&self) {
        metrics::counter!(
            "queuesim_server_transitions_total",
            "component" => self.id.to_string(),
            "to" => self.status().label()
        )
        .increment(1);
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("state", &self.status())
            .field("next_event", &self.next_event)
            .field("next_down", &self.next_down)
            .field("served", &self.served)
            .finish()
    }
}
