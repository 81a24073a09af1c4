//! Multi-server queue stage
//!
//! A [`SimQueue`] buffers arriving customers in strict FIFO order and hands
//! them to its servers as they become available. Customers that finish
//! service are routed to one of the queue's destinations.
//!
//! The queue's next event is the earliest event of any of its servers. When
//! several servers are due at the same instant the one with the lowest
//! [`ServerId`] goes first; the others follow in later steps at the same
//! simulated time.

use crate::assign::{DestinationCandidate, DestinationPolicy, ServerCandidate, ServerPolicy};
use crate::error::ComponentError;
use crate::server::Server;
use queuesim_core::{
    Customer, EventKind, Network, NextEvent, ServerId, SimTime, Stage, StageEvent, StageId,
};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

pub struct SimQueue {
    id: StageId,
    buffer: VecDeque<Customer>,
    servers: BTreeMap<ServerId, Server>,
    destinations: Vec<StageId>,
    server_policy: Box<dyn ServerPolicy>,
    destination_policy: Box<dyn DestinationPolicy>,
    /// Latest time this queue has processed an event or taken an arrival.
    clock: SimTime,
}

impl SimQueue {
    pub fn new(
        id: impl Into<StageId>,
        server_policy: impl ServerPolicy + 'static,
        destination_policy: impl DestinationPolicy + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            buffer: VecDeque::new(),
            servers: BTreeMap::new(),
            destinations: Vec::new(),
            server_policy: Box::new(server_policy),
            destination_policy: Box::new(destination_policy),
            clock: SimTime::zero(),
        }
    }

    /// Attach a server. Its first scheduled event may not lie before the
    /// latest time this queue has seen.
    pub fn add_server(&mut self, server: Server) -> Result<(), ComponentError> {
        self.add_server_at(server, self.clock)
    }

    /// Attach a server while the simulation stands at `now`. Waiting
    /// customers may enter service on it at once.
    pub fn add_server_at(&mut self, server: Server, now: SimTime) -> Result<(), ComponentError> {
        let now = now.max(self.clock);
        if let NextEvent::At(requested) = server.next_event_time() {
            if requested < now {
                warn!(stage = %self.id, server = %server.id(), %requested, %now, "Refusing server scheduled in the past");
                return Err(ComponentError::TimeInPast { requested, now });
            }
        }
        if self.servers.contains_key(server.id()) {
            return Err(ComponentError::DuplicateServer {
                stage: self.id.clone(),
                server: server.id().clone(),
            });
        }
        debug!(stage = %self.id, server = %server.id(), "Added server");
        self.servers.insert(server.id().clone(), server);
        self.clock = now;
        self.advance(now);
        Ok(())
    }

    /// Detach a server. A server still holding a customer cannot be removed.
    pub fn remove_server(&mut self, id: &ServerId) -> Result<Server, ComponentError> {
        match self.servers.get(id) {
            None => Err(ComponentError::UnknownServer {
                stage: self.id.clone(),
                server: id.clone(),
            }),
            Some(server) if server.is_busy() => Err(ComponentError::ServerBusy { server: id.clone() }),
            Some(_) => self.servers.remove(id).ok_or_else(|| ComponentError::UnknownServer {
                stage: self.id.clone(),
                server: id.clone(),
            }),
        }
    }

    pub fn add_destination(&mut self, destination: impl Into<StageId>) -> Result<(), ComponentError> {
        let destination = destination.into();
        if self.destinations.contains(&destination) {
            return Err(ComponentError::DuplicateDestination {
                stage: self.id.clone(),
                destination,
            });
        }
        self.destinations.push(destination);
        Ok(())
    }

    pub fn remove_destination(&mut self, destination: &StageId) -> Result<(), ComponentError> {
        let Some(pos) = self.destinations.iter().position(|d| d == destination) else {
            return Err(ComponentError::UnknownDestination {
                stage: self.id.clone(),
                destination: destination.clone(),
            });
        };
        self.destinations.remove(pos);
        Ok(())
    }

    pub fn destinations(&self) -> &[StageId] {
        &self.destinations
    }

    pub fn server(&self, id: &ServerId) -> Option<&Server> {
        self.servers.get(id)
    }

    /// Servers in id order.
    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    /// Customers in the wait buffer, oldest first.
    pub fn waiting_customers(&self) -> impl Iterator<Item = &Customer> {
        self.buffer.iter()
    }

    pub fn available_server_count(&self) -> usize {
        self.servers.values().filter(|s| s.is_available()).count()
    }

    pub fn busy_server_count(&self) -> usize {
        self.servers.values().filter(|s| s.is_busy()).count()
    }

    /// Kind of the event [`Stage::next_event_time`] refers to.
    pub fn next_event_kind(&self) -> Option<EventKind> {
        self.due_server().and_then(|(_, server)| server.next_event_kind())
    }

    /// Schedule server `id` to go down at `at`, no earlier than `now` or the
    /// latest time this queue has seen.
    pub fn pause_server(&mut self, id: &ServerId, at: SimTime, now: SimTime) -> Result<(), ComponentError> {
        let server = self.checked_server(id, at, now)?;
        if server.pause_service(at) {
            debug!(server = %id, %at, "Server pause scheduled");
            Ok(())
        } else {
            Err(ComponentError::InvalidTransition {
                server: id.clone(),
                action: "pause",
            })
        }
    }

    /// Bring out-of-service server `id` back at `at`, no earlier than `now` or
    /// the latest time this queue has seen.
    pub fn resume_server(&mut self, id: &ServerId, at: SimTime, now: SimTime) -> Result<(), ComponentError> {
        let server = self.checked_server(id, at, now)?;
        if server.resume_service(at) {
            debug!(server = %id, %at, "Server resume scheduled");
            Ok(())
        } else {
            Err(ComponentError::InvalidTransition {
                server: id.clone(),
                action: "resume",
            })
        }
    }

    fn checked_server(&mut self, id: &ServerId, at: SimTime, now: SimTime) -> Result<&mut Server, ComponentError> {
        let now = now.max(self.clock);
        if at < now {
            return Err(ComponentError::TimeInPast { requested: at, now });
        }
        self.servers.get_mut(id).ok_or_else(|| ComponentError::UnknownServer {
            stage: self.id.clone(),
            server: id.clone(),
        })
    }

    /// The lowest-id server whose event is earliest.
    fn due_server(&self) -> Option<(&ServerId, &Server)> {
        let mut best: Option<(&ServerId, &Server, SimTime)> = None;
        for (id, server) in &self.servers {
            if let NextEvent::At(t) = server.next_event_time() {
                if best.map_or(true, |(_, _, bt)| t < bt) {
                    best = Some((id, server, t));
                }
            }
        }
        best.map(|(id, server, _)| (id, server))
    }

    /// Move waiting customers into service while both exist.
    fn advance(&mut self, now: SimTime) {
        let passes = self.buffer.len().min(self.available_server_count());
        for _ in 0..passes {
            let chosen = {
                let candidates: Vec<ServerCandidate<'_>> = self
                    .servers
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, server))| server.is_available())
                    .map(|(ordinal, (id, server))| ServerCandidate {
                        id,
                        ordinal,
                        served: server.served(),
                        available_since: server.available_since(),
                    })
                    .collect();
                self.server_policy
                    .select(&candidates)
                    .and_then(|i| candidates.get(i))
                    .map(|c| c.id.clone())
            };
            let Some(server_id) = chosen else {
                break;
            };
            let Some(server) = self.servers.get_mut(&server_id) else {
                break;
            };
            let Some(customer) = self.buffer.pop_front() else {
                break;
            };
            if let Err(customer) = server.accept_customer(now, customer) {
                warn!(stage = %self.id, server = %server_id, customer = %customer.id(), "Assignment refused; customer returned to head of queue");
                self.buffer.push_front(customer);
                break;
            }
        }
        self.record_queue_length();
    }

    fn route(&mut self, now: SimTime, customer: Customer, network: &mut Network<'_>) {
        let chosen = {
            let candidates: Vec<DestinationCandidate<'_>> = self
                .destinations
                .iter()
                .map(|id| DestinationCandidate {
                    id,
                    waiting: if *id == self.id {
                        Some(self.buffer.len())
                    } else {
                        network.waiting_count(id)
                    },
                })
                .collect();
            self.destination_policy
                .select(&candidates)
                .and_then(|i| candidates.get(i))
                .map(|c| c.id.clone())
        };
        match chosen {
            Some(dest) => {
                debug!(stage = %self.id, customer = %customer.id(), dest = %dest, "Routing customer");
                network.deliver(now, &dest, customer);
            }
            None => network.drop_customer(&self.id, customer),
        }
    }

    fn record_queue_length(&self) {
        metrics::gauge!("queuesim_queue_length", "component" => self.id.to_string())
            .set(self.buffer.len() as f64);
    }
}

impl Stage for SimQueue {
    fn id(&self) -> &StageId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        !self.servers.is_empty() && !self.destinations.is_empty()
    }

    fn next_event_time(&self) -> NextEvent {
        if !self.is_valid() {
            return NextEvent::NotApplicable;
        }
        match self.due_server() {
            Some((_, server)) => server.next_event_time(),
            None => NextEvent::Never,
        }
    }

    fn process_event(&mut self, now: SimTime, network: &mut Network<'_>) -> Option<StageEvent> {
        let NextEvent::At(due) = self.next_event_time() else {
            warn!(stage = %self.id, %now, "Queue has no event to process");
            return None;
        };
        if now != due {
            warn!(stage = %self.id, %now, %due, "Queue event processed at the wrong time, ignoring");
            return None;
        }
        self.clock = now;

        let (server_id, kind) = self
            .due_server()
            .and_then(|(id, server)| Some((id.clone(), server.next_event_kind()?)))?;
        let released = self.servers.get_mut(&server_id)?.process_event(now);
        let customer_id = released.as_ref().map(|c| c.id().clone());

        if let Some(customer) = released {
            metrics::counter!("queuesim_departures_total", "component" => self.id.to_string()).increment(1);
            self.route(now, customer, network);
        }
        self.advance(now);

        Some(StageEvent {
            stage: self.id.clone(),
            kind,
            time: now,
            customer: customer_id,
        })
    }

    fn accept_arrival(&mut self, now: SimTime, mut customer: Customer) -> Result<(), Customer> {
        if !self.is_valid() {
            warn!(stage = %self.id, customer = %customer.id(), "Queue is not configured, refusing arrival");
            return Err(customer);
        }
        self.clock = self.clock.max(now);
        customer.log_arrival(now, self.id.clone());
        debug!(stage = %self.id, customer = %customer.id(), waiting = self.buffer.len(), "Customer joined queue");
        metrics::counter!("queuesim_arrivals_total", "component" => self.id.to_string()).increment(1);
        self.buffer.push_back(customer);
        self.advance(now);
        Ok(())
    }

    fn waiting_count(&self) -> Option<usize> {
        Some(self.buffer.len())
    }

    fn customers_held(&self) -> usize {
        self.buffer.len() + self.busy_server_count()
    }
}
