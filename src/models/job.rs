//! Job and completion models.
//!
//! A job is a unit of work submitted to the simulated resource: it arrives
//! at a point in virtual time and requires a fixed amount of service (its
//! true size). The scheduler under evaluation never sees the true size
//! after admission — only an estimate of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque job identifier.
///
/// An integer handle chosen by the caller; the simulator only compares and
/// hashes it. Callers with richer keys keep their own mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct JobId(pub u64);

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A job submitted to the simulated resource.
///
/// Immutable once created. Arrival time and size are non-negative reals in
/// virtual time units; the unit itself is up to the caller (seconds,
/// normalized service times, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Time at which the job enters the system.
    pub arrival: f64,
    /// True service requirement.
    pub size: f64,
}

impl Job {
    /// Creates a job with the given id, arrival time, and true size.
    pub fn new(id: impl Into<JobId>, arrival: f64, size: f64) -> Self {
        Self {
            id: id.into(),
            arrival,
            size,
        }
    }
}

/// A finished job together with its completion time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The job that finished.
    pub job: JobId,
    /// Virtual time at which its true remaining work reached zero.
    pub time: f64,
}

impl Completion {
    /// Creates a completion record.
    pub fn new(job: impl Into<JobId>, time: f64) -> Self {
        Self {
            job: job.into(),
            time,
        }
    }
}
