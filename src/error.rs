//! Errors raised by this crate itself.
//!
//! Native driver failures are never wrapped; they surface as the driver's
//! own [`DriverError`](crate::DriverError).

use thiserror::Error;

use crate::profiler::ExecutionKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfilingError {
    /// A required collaborator was not supplied.
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),

    /// The profiler returned without running the execution it was handed.
    #[error("profiler returned without running the {0} execution")]
    ExecutionSkipped(ExecutionKind),
}

pub type Result<T, E = ProfilingError> = std::result::Result<T, E>;
