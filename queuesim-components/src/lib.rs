//! Building blocks for queueing networks
//!
//! This crate provides the stages a network is assembled from, all
//! implementing [`queuesim_core::Stage`]:
//!
//! - [`SourcePopulation`]: renewal-process arrival generator
//! - [`SimQueue`]: FIFO wait buffer in front of a pool of [`Server`]s
//! - [`SystemExit`]: terminal sink collecting finished customers
//!
//! plus the assignment strategies that route customers between them.
//!
//! ```rust,ignore
//! use queuesim_components::{Server, SimQueue, SourcePopulation, SystemExit, Sequential};
//! use queuesim_core::dists::Constant;
//!
//! let mut source = SourcePopulation::new("SP0", Sequential::new())
//!     .with_interarrival(Constant::new(Duration::from_secs(6)));
//! source.add_destination("Q0")?;
//!
//! let mut queue = SimQueue::new("Q0", Sequential::new(), Sequential::new());
//! queue.add_server(Server::new("S0", Constant::new(Duration::from_secs(10))))?;
//! queue.add_destination("EXIT")?;
//!
//! sim.add_stage(source)?;
//! sim.add_stage(queue)?;
//! sim.add_stage(SystemExit::new("EXIT"))?;
//! ```

pub mod assign;
pub mod builder;
pub mod error;
pub mod exit;
pub mod queue;
pub mod server;
pub mod source;

pub use assign::{
    DestinationCandidate, DestinationPolicy, EarliestAvailable, Sequential, ServerCandidate,
    ServerPolicy, ShortestQueue,
};
pub use builder::{ServerBuilder, Validate, ValidationError, ValidationResult};
pub use error::ComponentError;
pub use exit::SystemExit;
pub use queue::SimQueue;
pub use server::{Server, ServerState};
pub use source::SourcePopulation;
