//! Assignment strategies
//!
//! Two policy roles pick one element out of a candidate slice:
//!
//! - [`DestinationPolicy`]: where a customer goes after leaving a source or
//!   finishing service (candidates are the stage's destinations, in the
//!   order they were added).
//! - [`ServerPolicy`]: which available server a waiting customer is handed
//!   to (candidates are the queue's currently available servers, in id
//!   order).
//!
//! Policies may keep internal state such as a rotation cursor, but never
//! modify the candidates. They return the index of the chosen candidate,
//! or `None` for an empty slice.

use queuesim_core::{ServerId, SimTime, StageId};

/// A destination a customer may be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationCandidate<'a> {
    pub id: &'a StageId,
    /// Customers waiting there; `None` when the stage has no waiting line.
    pub waiting: Option<usize>,
}

/// An available server a customer may be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCandidate<'a> {
    pub id: &'a ServerId,
    /// Position of the server in the queue's full server ordering.
    pub ordinal: usize,
    /// Customers the server has finished serving.
    pub served: u64,
    pub available_since: Option<SimTime>,
}

/// Chooses the next destination for a customer.
pub trait DestinationPolicy: Send {
    fn select(&mut self, candidates: &[DestinationCandidate<'_>]) -> Option<usize>;
}

/// Chooses the server that receives the next waiting customer.
pub trait ServerPolicy: Send {
    fn select(&mut self, candidates: &[ServerCandidate<'_>]) -> Option<usize>;
}

/// Round-robin over a fixed ordering, wrapping around at the end.
///
/// Remembers the ordinal it picked last and moves to the first candidate
/// past it. When some members of the ordering are absent from the candidate
/// slice (busy servers), they are skipped.
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    last: Option<usize>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    fn rotate(&mut self, ordinals: impl Iterator<Item = usize> + Clone) -> Option<usize> {
        let after_last = ordinals
            .clone()
            .enumerate()
            .find(|&(_, ordinal)| self.last.map_or(true, |last| ordinal > last));
        let (index, ordinal) = after_last.or_else(|| ordinals.enumerate().next())?;
        self.last = Some(ordinal);
        Some(index)
    }
}

impl DestinationPolicy for Sequential {
    fn select(&mut self, candidates: &[DestinationCandidate<'_>]) -> Option<usize> {
        self.rotate(0..candidates.len())
    }
}

impl ServerPolicy for Sequential {
    fn select(&mut self, candidates: &[ServerCandidate<'_>]) -> Option<usize> {
        self.rotate(candidates.iter().map(|c| c.ordinal))
    }
}

/// Picks the least loaded candidate; ties go to the earliest in the ordering.
///
/// For destinations the load is the waiting line (stages without one rank
/// last). For servers it is the number of customers served so far, which
/// spreads work evenly across a pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestQueue;

impl DestinationPolicy for ShortestQueue {
    fn select(&mut self, candidates: &[DestinationCandidate<'_>]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (c.waiting.is_none(), c.waiting.unwrap_or(0)))
            .map(|(index, _)| index)
    }
}

impl ServerPolicy for ShortestQueue {
    fn select(&mut self, candidates: &[ServerCandidate<'_>]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.served)
            .map(|(index, _)| index)
    }
}

/// Picks the server that has been idle the longest.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestAvailable;

impl ServerPolicy for EarliestAvailable {
    fn select(&mut self, candidates: &[ServerCandidate<'_>]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (c.available_since.is_none(), c.available_since))
            .map(|(index, _)| index)
    }
}
