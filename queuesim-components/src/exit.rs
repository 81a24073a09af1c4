use queuesim_core::{Customer, CustomerId, NextEvent, SimTime, Stage, StageId};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Terminal stage: collects customers that have finished their journey.
pub struct SystemExit {
    id: StageId,
    customers: Vec<Customer>,
    seen: HashSet<CustomerId>,
}

impl SystemExit {
    pub fn new(id: impl Into<StageId>) -> Self {
        Self {
            id: id.into(),
            customers: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Collected customers in exit order.
    pub fn iter(&self) -> std::slice::Iter<'_, Customer> {
        self.customers.iter()
    }

    /// Collected customers ordered by the time they entered the system.
    pub fn by_arrival_time(&self) -> Vec<&Customer> {
        let mut sorted: Vec<&Customer> = self.customers.iter().collect();
        sorted.sort_by_key(|c| c.system_arrival_time());
        sorted
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl<'a> IntoIterator for &'a SystemExit {
    type Item = &'a Customer;
    type IntoIter = std::slice::Iter<'a, Customer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Stage for SystemExit {
    fn id(&self) -> &StageId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn next_event_time(&self) -> NextEvent {
        NextEvent::Never
    }

    fn accept_arrival(&mut self, now: SimTime, customer: Customer) -> Result<(), Customer> {
        if !self.seen.insert(customer.id().clone()) {
            warn!(stage = %self.id, customer = %customer.id(), "Customer already exited, refusing duplicate");
            return Err(customer);
        }
        debug!(stage = %self.id, customer = %customer.id(), %now, "Customer left the system");
        self.customers.push(customer);
        Ok(())
    }

    fn waiting_count(&self) -> Option<usize> {
        Some(0)
    }

    fn departed(&self) -> &[Customer] {
        &self.customers
    }
}
