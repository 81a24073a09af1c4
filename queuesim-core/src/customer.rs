//! Customers and the per-visit experience records they carry.

use crate::time::SimTime;
use crate::types::{CustomerId, ServerId, StageId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timestamps for one visit of a customer to one stage.
///
/// Fields that have not happened yet are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub stage_id: StageId,
    pub queue_entry_time: SimTime,
    pub server_id: Option<ServerId>,
    pub service_entry_time: Option<SimTime>,
    pub service_completion_time: Option<SimTime>,
    pub waiting_time: Option<Duration>,
    pub system_time: Option<Duration>,
}

impl Experience {
    fn new(stage_id: StageId, queue_entry_time: SimTime) -> Self {
        Self {
            stage_id,
            queue_entry_time,
            server_id: None,
            service_entry_time: None,
            service_completion_time: None,
            waiting_time: None,
            system_time: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.service_completion_time.is_some()
    }
}

/// A unit of work travelling through the network.
///
/// A customer has exactly one owner at a time; it moves by value from
/// source to queue buffer to server and on to the next stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    system_arrival_time: SimTime,
    experiences: Vec<Experience>,
}

impl Customer {
    pub fn new(id: CustomerId, system_arrival_time: SimTime) -> Self {
        Self {
            id,
            system_arrival_time,
            experiences: Vec::new(),
        }
    }

    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    /// Time the customer was created by its source.
    pub fn system_arrival_time(&self) -> SimTime {
        self.system_arrival_time
    }

    /// Visits in the order they happened.
    pub fn experiences(&self) -> &[Experience] {
        &self.experiences
    }

    /// The visit currently being recorded, if any.
    pub fn current_experience(&self) -> Option<&Experience> {
        self.experiences.last()
    }

    /// Open a new experience record for an arrival at `stage_id`.
    pub fn log_arrival(&mut self, time: SimTime, stage_id: StageId) {
        self.experiences.push(Experience::new(stage_id, time));
    }

    /// Stamp service entry on the current visit. Returns `false` if there is
    /// no open visit to stamp.
    pub fn log_service_entry(&mut self, time: SimTime, server_id: ServerId) -> bool {
        let Some(exp) = self.experiences.last_mut() else {
            return false;
        };
        exp.waiting_time = Some(time - exp.queue_entry_time);
        exp.service_entry_time = Some(time);
        exp.server_id = Some(server_id);
        true
    }

    /// Stamp service completion on the current visit.
    pub fn log_service_completion(&mut self, time: SimTime) -> bool {
        let Some(exp) = self.experiences.last_mut() else {
            return false;
        };
        exp.service_completion_time = Some(time);
        exp.system_time = Some(time - exp.queue_entry_time);
        true
    }

    /// Total time spent waiting across all visits, or `None` while any visit
    /// has not yet entered service.
    pub fn total_waiting_time(&self) -> Option<Duration> {
        self.experiences.iter().map(|e| e.waiting_time).sum()
    }

    /// Total time spent in queues and service, or `None` while any visit is
    /// still open.
    pub fn total_system_time(&self) -> Option<Duration> {
        self.experiences.iter().map(|e| e.system_time).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer::new(CustomerId::new(StageId::new("SP0"), 2), SimTime::from_secs(6))
    }

    #[test]
    fn test_experience_timestamps() {
        let mut cust = customer();
        cust.log_arrival(SimTime::from_secs(6), StageId::new("Q0"));
        assert!(cust.log_service_entry(SimTime::from_secs(10), ServerId::new("S0")));
        assert!(cust.log_service_completion(SimTime::from_secs(20)));

        let exp = cust.current_experience().unwrap();
        assert_eq!(exp.stage_id, StageId::new("Q0"));
        assert_eq!(exp.server_id, Some(ServerId::new("S0")));
        assert_eq!(exp.waiting_time, Some(Duration::from_secs(4)));
        assert_eq!(exp.system_time, Some(Duration::from_secs(14)));
        assert!(exp.is_complete());
    }

    #[test]
    fn test_totals_span_visits() {
        let mut cust = customer();
        cust.log_arrival(SimTime::from_secs(6), StageId::new("Q0"));
        cust.log_service_entry(SimTime::from_secs(8), ServerId::new("S0"));
        cust.log_service_completion(SimTime::from_secs(9));
        cust.log_arrival(SimTime::from_secs(9), StageId::new("Q1"));
        cust.log_service_entry(SimTime::from_secs(12), ServerId::new("S0"));

        assert_eq!(cust.total_waiting_time(), Some(Duration::from_secs(5)));
        // Second visit still in service
        assert_eq!(cust.total_system_time(), None);

        cust.log_service_completion(SimTime::from_secs(15));
        assert_eq!(cust.total_system_time(), Some(Duration::from_secs(9)));
        assert_eq!(cust.experiences().len(), 2);
    }

    #[test]
    fn test_stamps_without_arrival_are_rejected() {
        let mut cust = customer();
        assert!(!cust.log_service_entry(SimTime::from_secs(1), ServerId::new("S0")));
        assert!(!cust.log_service_completion(SimTime::from_secs(2)));
        assert!(cust.experiences().is_empty());
        assert_eq!(cust.total_waiting_time(), Some(Duration::ZERO));
    }
}
