//! Scheduling policy state machines.
//!
//! Each policy is a state machine driven by the simulator through the same
//! four-operation contract: admit a job with an estimated size, retire it
//! when its true work is exhausted, report the current resource allocation,
//! and optionally predict the next instant its own allocation would change.
//! A policy never sees a job's true size after admission — only the
//! estimate — while the simulator independently tracks true remaining work.
//!
//! # Policies
//!
//! - **Blind to size**: [`Fifo`], [`Ps`], [`Las`]
//! - **Size-based**: [`Srpt`], [`Fsp`] (with its fair-late variant)
//! - **Hybrids bounding estimation-error unfairness**: [`SrptPs`],
//!   [`SrptLas`], [`FspLas`]
//!
//! The hybrids exist because SRPT and FSP are starvation-prone when size
//! estimates are wrong: a job estimated small may in truth run long, and
//! vice versa. Once a job's estimated work is exhausted without the job
//! finishing it is *late*, and the hybrids fold late jobs back into a
//! processor-sharing or least-attained-service discipline.
//!
//! # References
//!
//! - Schrage (1968), "A Proof of the Optimality of the Shortest Remaining
//!   Processing Time Discipline"
//! - Friedman & Henderson (2003), "Fairness and Efficiency in Web Server
//!   Protocols" (FSP)
//! - Rai, Urvoy-Keller & Biersack (2003), "Analysis of LAS Scheduling for
//!   Job Size Distributions with High Variance"
//! - Dell'Amico, Carra & Michiardi (2014), "Revisiting Size-Based
//!   Scheduling with Estimated Job Sizes"

mod fifo;
mod fsp;
mod fsp_las;
mod las;
mod ps;
mod rank;
mod service;
mod srpt;
mod srpt_las;

pub use fifo::Fifo;
pub use fsp::Fsp;
pub use fsp_las::FspLas;
pub use las::Las;
pub use ps::Ps;
pub use srpt::{Srpt, SrptPs};
pub use srpt_las::SrptLas;

pub(crate) use rank::RankedQueue;
pub(crate) use service::AttainedQueue;

use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// Default tolerance for "effectively done" comparisons.
///
/// Absorbs the drift of repeated floating-point subtraction from virtual
/// remaining-work and attained-service bookkeeping.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// A scheduling discipline for a single shared resource.
///
/// # Contract
///
/// The simulator calls these methods synchronously, on one call stack, in
/// event order. `schedule` must be idempotent: calling it again at the
/// same `t` with no intervening `enqueue`/`dequeue` returns the same
/// allocation.
pub trait Policy {
    /// Policy name (e.g. "SRPT", "FSP+LAS").
    fn name(&self) -> &'static str;

    /// Admits a job with its estimated size at time `t`.
    ///
    /// Fails if the job is already admitted — the simulator and policy
    /// have desynchronized.
    fn enqueue(&mut self, t: f64, job: JobId, estimated_size: f64) -> Result<(), SimulationError>;

    /// Retires a job whose true work is exhausted, at time `t`.
    ///
    /// Called exactly once per job. Fails if the job is not tracked.
    fn dequeue(&mut self, t: f64, job: JobId) -> Result<(), SimulationError>;

    /// Advances internal virtual-time bookkeeping to `t` and returns the
    /// current allocation of the resource.
    fn schedule(&mut self, t: f64) -> Allocation;

    /// Soonest future offset, relative to the last `schedule` time, at
    /// which this policy's allocation would change absent external
    /// events. `None` if the allocation is static until the next
    /// arrival or departure.
    fn next_internal_event(&self) -> Option<f64> {
        None
    }
}

/// Closed set of available policies.
///
/// Builds a fresh state machine per simulation run, so runs never share
/// mutable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// First-in first-out: the whole resource to the oldest job.
    Fifo,
    /// Processor sharing: equal share to every admitted job.
    Ps,
    /// Shortest remaining (estimated) processing time.
    Srpt,
    /// SRPT with processor sharing across late jobs.
    SrptPs,
    /// Fair sojourn protocol: serialize in virtual fair-sharing order.
    Fsp,
    /// FSP with processor sharing across late jobs.
    FspPs,
    /// Least attained service.
    Las,
    /// SRPT with least-attained-service contention among late jobs.
    SrptLas,
    /// FSP with least-attained-service contention among late jobs.
    FspLas,
}

impl PolicyKind {
    /// Every available policy, in presentation order.
    pub const ALL: [PolicyKind; 9] = [
        PolicyKind::Fifo,
        PolicyKind::Ps,
        PolicyKind::Srpt,
        PolicyKind::SrptPs,
        PolicyKind::Fsp,
        PolicyKind::FspPs,
        PolicyKind::Las,
        PolicyKind::SrptLas,
        PolicyKind::FspLas,
    ];

    /// Policy name (e.g. "SRPT+PS").
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::Ps => "PS",
            Self::Srpt => "SRPT",
            Self::SrptPs => "SRPT+PS",
            Self::Fsp => "FSP",
            Self::FspPs => "FSP+PS",
            Self::Las => "LAS",
            Self::SrptLas => "SRPT+LAS",
            Self::FspLas => "FSP+LAS",
        }
    }

    /// Builds a fresh policy instance with the given tolerance.
    pub fn build(&self, epsilon: f64) -> Box<dyn Policy> {
        match self {
            Self::Fifo => Box::new(Fifo::new()),
            Self::Ps => Box::new(Ps::new()),
            Self::Srpt => Box::new(Srpt::new()),
            Self::SrptPs => Box::new(SrptPs::new(epsilon)),
            Self::Fsp => Box::new(Fsp::new(epsilon)),
            Self::FspPs => Box::new(Fsp::fair_late(epsilon)),
            Self::Las => Box::new(Las::new(epsilon)),
            Self::SrptLas => Box::new(SrptLas::new(epsilon)),
            Self::FspLas => Box::new(FspLas::new(epsilon)),
        }
    }
}

/// Number of ε-sized service quanta in `value`, rounded up.
///
/// The LAS-family policies do their bookkeeping in integer quanta instead
/// of raw floats, so equality of attained service is exact.
pub(crate) fn quanta(value: f64, epsilon: f64) -> i64 {
    (value / epsilon).ceil() as i64
}

/// Ceiling of a quantum product as an integer count.
pub(crate) fn ceil_quanta(value: f64) -> i64 {
    value.ceil() as i64
}
