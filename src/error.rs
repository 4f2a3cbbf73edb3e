//! Runtime simulation errors.
//!
//! Every variant here is fatal: it either signals that the simulator and
//! the policy disagree about which jobs exist (a desynchronization that
//! must never happen in correct operation), or that the caller's
//! configuration does not match the workload. A run that produces one of
//! these errors aborts immediately; there is no retry concept.

use std::fmt;

use crate::models::JobId;

/// A fatal error raised during a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A job was dequeued, or allocated resources, while not being tracked.
    UnknownJob { job: JobId },
    /// A job was enqueued while already admitted.
    DuplicateJob { job: JobId },
    /// A job's true remaining work fell below `-ε`.
    NegativeRemaining { job: JobId, remaining: f64 },
    /// The event stream is exhausted but jobs still hold remaining work.
    UnfinishedJobs { count: usize },
    /// The fixed-replay estimator was called more times than it has values.
    EstimatesExhausted,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownJob { job } => {
                write!(f, "job {job} is not tracked by the policy")
            }
            Self::DuplicateJob { job } => {
                write!(f, "job {job} is already admitted")
            }
            Self::NegativeRemaining { job, remaining } => {
                write!(
                    f,
                    "job {job} has negative remaining work beyond tolerance ({remaining})"
                )
            }
            Self::UnfinishedJobs { count } => {
                write!(f, "event stream exhausted with {count} unfinished job(s)")
            }
            Self::EstimatesExhausted => {
                write!(f, "fixed estimate sequence exhausted before the last arrival")
            }
        }
    }
}

impl std::error::Error for SimulationError {}
