//! Arrival generation
//!
//! A [`SourcePopulation`] creates customers as a renewal process: each
//! arrival is scheduled one inter-arrival draw after the previous scheduled
//! arrival, independent of when the orchestrator actually got to it.

use crate::assign::{DestinationCandidate, DestinationPolicy};
use crate::error::ComponentError;
use queuesim_core::{
    Customer, CustomerId, Distribution, EventKind, Network, NextEvent, SimTime, Stage, StageEvent,
    StageId,
};
use tracing::{debug, warn};

pub struct SourcePopulation {
    id: StageId,
    interarrival: Option<Box<dyn Distribution>>,
    destinations: Vec<StageId>,
    destination_policy: Box<dyn DestinationPolicy>,
    next_arrival: Option<SimTime>,
    created: u64,
}

impl SourcePopulation {
    pub fn new(id: impl Into<StageId>, destination_policy: impl DestinationPolicy + 'static) -> Self {
        Self {
            id: id.into(),
            interarrival: None,
            destinations: Vec::new(),
            destination_policy: Box::new(destination_policy),
            next_arrival: None,
            created: 0,
        }
    }

    /// Bind the inter-arrival distribution; the first arrival is one draw
    /// after time zero.
    pub fn with_interarrival(self, dist: impl Distribution + 'static) -> Self {
        self.with_interarrival_from(dist, SimTime::zero())
    }

    /// Bind the inter-arrival distribution with the first arrival one draw
    /// after `start`.
    pub fn with_interarrival_from(mut self, dist: impl Distribution + 'static, start: SimTime) -> Self {
        let mut dist: Box<dyn Distribution> = Box::new(dist);
        self.next_arrival = dist.draw().map(|offset| start + offset);
        if self.next_arrival.is_none() {
            warn!(stage = %self.id, "Inter-arrival distribution produced no first arrival");
        }
        self.interarrival = Some(dist);
        self
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

    /// Scheduled time of the next arrival.
    pub fn next_arrival(&self) -> Option<SimTime> {
        self.next_arrival
    }

    /// Whether a distribution and at least one destination are bound. An
    /// exhausted distribution still lets the already scheduled arrival happen.
    fn is_configured(&self) -> bool {
        self.interarrival.is_some() && !self.destinations.is_empty()
    }
}

impl Stage for SourcePopulation {
    fn id(&self) -> &StageId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        self.is_configured() && self.interarrival.as_ref().is_some_and(|d| d.is_valid())
    }

    fn next_event_time(&self) -> NextEvent {
        if !self.is_configured() {
            return NextEvent::NotApplicable;
        }
        NextEvent::from_time(self.next_arrival)
    }

    fn process_event(&mut self, now: SimTime, network: &mut Network<'_>) -> Option<StageEvent> {
        if !self.is_configured() {
            warn!(stage = %self.id, "Source is not configured, nothing to process");
            return None;
        }
        let scheduled = self.next_arrival?;
        if now < scheduled {
            warn!(stage = %self.id, %now, %scheduled, "Arrival processed before it is due, ignoring");
            return None;
        }

        self.created += 1;
        let customer = Customer::new(CustomerId::new(self.id.clone(), self.created), now);
        let customer_id = customer.id().clone();
        metrics::counter!("queuesim_arrivals_total", "component" => self.id.to_string()).increment(1);

        let chosen = {
            let candidates: Vec<DestinationCandidate<'_>> = self
                .destinations
                .iter()
                .map(|id| DestinationCandidate {
                    id,
                    waiting: network.waiting_count(id),
                })
                .collect();
            self.destination_policy
                .select(&candidates)
                .and_then(|i| candidates.get(i))
                .map(|c| c.id.clone())
        };
        match chosen {
            Some(dest) => {
                debug!(stage = %self.id, customer = %customer_id, dest = %dest, "New arrival");
                network.deliver(now, &dest, customer);
            }
            None => network.drop_customer(&self.id, customer),
        }

        let offset = self.interarrival.as_mut().and_then(|d| d.draw());
        if offset.is_none() {
            warn!(stage = %self.id, "Inter-arrival distribution exhausted; no further arrivals");
        }
        self.next_arrival = offset.map(|d| scheduled + d);

        Some(StageEvent {
            stage: self.id.clone(),
            kind: EventKind::Arrival,
            time: now,
            customer: Some(customer_id),
        })
    }

    fn customers_created(&self) -> u64 {
        self.created
    }
}
