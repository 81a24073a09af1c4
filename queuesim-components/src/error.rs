//! Error types for network components

use queuesim_core::{ServerId, SimTime, StageId};
use thiserror::Error;

/// Errors from configuring or manually driving a component.
///
/// Normal event processing never produces these; a stage that cannot do its
/// work declines it instead (see [`queuesim_core::Stage`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("Stage {stage} already has a server {server}")]
    DuplicateServer { stage: StageId, server: ServerId },

    #[error("Stage {stage} has no server {server}")]
    UnknownServer { stage: StageId, server: ServerId },

    #[error("Server {server} is busy and cannot be removed")]
    ServerBusy { server: ServerId },

    #[error("Stage {stage} already routes to {destination}")]
    DuplicateDestination { stage: StageId, destination: StageId },

    #[error("Stage {stage} does not route to {destination}")]
    UnknownDestination { stage: StageId, destination: StageId },

    #[error("Requested time {requested} is before the current time {now}")]
    TimeInPast { requested: SimTime, now: SimTime },

    #[error("Server {server} cannot {action} in its current state")]
    InvalidTransition {
        server: ServerId,
        action: &'static str,
    },
}
