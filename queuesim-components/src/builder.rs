//! Validated construction of servers
//!
//! A [`Server`] is the only component with enough optional configuration to
//! warrant a builder: a service time distribution is required, a breakdown
//! model (time between failures and repair time) is optional.
//!
//! # Example
//!
//! ```ignore
//! use queuesim_components::builder::ServerBuilder;
//! use queuesim_core::dists::{Constant, Exponential};
//!
//! let server = ServerBuilder::new("S0")
//!     .service_time(Exponential::new(Duration::from_secs(8), 7)?)
//!     .breakdowns(Constant::new(Duration::from_secs(3600)), Constant::new(Duration::from_secs(60)))
//!     .build()?;
//! ```

use crate::server::{Breakdowns, Server};
use queuesim_core::{Distribution, ServerId, SimTime};

/// Validation result for builder configuration
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors that can occur during builder validation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field '{field}'")]
    MissingField { field: String },
}

/// Checks a builder's configuration before `build()` consumes it.
pub trait Validate {
    /// # Errors
    ///
    /// Returns a `ValidationError` describing the first problem found.
    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

/// Helper for validating that a string is not empty
pub fn validate_non_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Helper for validating that a distribution can currently produce values
pub fn validate_distribution(field: &str, dist: &dyn Distribution) -> ValidationResult<()> {
    if dist.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "distribution reports itself invalid".to_string(),
        })
    }
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    id: String,
    service: Option<Box<dyn Distribution>>,
    breakdowns: Option<Breakdowns>,
    start: SimTime,
}

impl ServerBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service: None,
            breakdowns: None,
            start: SimTime::zero(),
        }
    }

    /// Distribution of service durations. Required.
    pub fn service_time(mut self, dist: impl Distribution + 'static) -> Self {
        self.service = Some(Box::new(dist));
        self
    }

    /// Make the server fail periodically: `time_to_down` is drawn each time
    /// the server comes up, `repair` each time it goes down.
    pub fn breakdowns(
        mut self,
        time_to_down: impl Distribution + 'static,
        repair: impl Distribution + 'static,
    ) -> Self {
        self.breakdowns = Some(Breakdowns {
            time_to_down: Box::new(time_to_down),
            repair: Box::new(repair),
        });
        self
    }

    /// Time the server comes into existence; the first down time is drawn
    /// relative to it. Defaults to zero.
    pub fn starting_at(mut self, start: SimTime) -> Self {
        self.start = start;
        self
    }

    pub fn build(self) -> ValidationResult<Server> {
        self.validate()?;
        let service = self.service.ok_or_else(|| ValidationError::MissingField {
            field: "service_time".to_string(),
        })?;
        Ok(Server::from_parts(
            ServerId::new(self.id),
            service,
            self.breakdowns,
            self.start,
        ))
    }
}

impl Validate for ServerBuilder {
    fn validate(&self) -> ValidationResult<()> {
        validate_non_empty("id", &self.id)?;
        match &self.service {
            Some(service) => validate_distribution("service_time", service.as_ref())?,
            None => {
                return Err(ValidationError::MissingField {
                    field: "service_time".to_string(),
                })
            }
        }
        if let Some(b) = &self.breakdowns {
            validate_distribution("time_to_down", b.time_to_down.as_ref())?;
            validate_distribution("repair", b.repair.as_ref())?;
        }
        Ok(())
    }
}
