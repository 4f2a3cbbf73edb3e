//! Shortest remaining processing time, and its fair late-job variant.
//!
//! Both rank jobs by estimated remaining work and serve the minimum.
//! Plain SRPT trusts the estimate unconditionally: a job whose estimate is
//! exhausted keeps the resource (its key just goes negative, keeping it at
//! the head) until its true work completes. SRPT+PS instead retires
//! estimate-exhausted jobs into a *late* set that processor-shares with
//! the current head, which bounds the starvation wrong estimates can
//! cause.
//!
//! # Reference
//! Schrage (1968); Dell'Amico, Carra & Michiardi (2014)

use std::collections::HashSet;

use super::{Policy, RankedQueue};
use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// Shortest remaining (estimated) processing time.
#[derive(Debug, Clone, Default)]
pub struct Srpt {
    queue: RankedQueue<f64>,
    last_t: f64,
}

impl Srpt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ages the head by the elapsed time: only the running job's estimate
    /// shrinks.
    fn update(&mut self, t: f64) {
        let delta = t - self.last_t;
        if delta == 0.0 {
            return;
        }
        if let Some(remaining) = self.queue.head_key_mut() {
            *remaining -= delta;
        }
        self.last_t = t;
    }
}

impl Policy for Srpt {
    fn name(&self) -> &'static str {
        "SRPT"
    }

    fn enqueue(&mut self, t: f64, job: JobId, estimated_size: f64) -> Result<(), SimulationError> {
        if self.queue.contains(job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        // Age the current head before it can be displaced.
        self.update(t);
        self.queue.insert(estimated_size, job);
        Ok(())
    }

    fn dequeue(&mut self, t: f64, job: JobId) -> Result<(), SimulationError> {
        self.update(t);
        match self.queue.remove(job) {
            Some(_) => Ok(()),
            None => Err(SimulationError::UnknownJob { job }),
        }
    }

    fn schedule(&mut self, t: f64) -> Allocation {
        self.update(t);
        match self.queue.head() {
            Some((_, job)) => Allocation::from([(job, 1.0)]),
            None => Allocation::new(),
        }
    }
}

/// SRPT with processor sharing across late jobs.
///
/// The head's estimate is aged at rate `1 / (1 + |late|)` — its actual
/// service share — and once it drops below ε the job is moved to the late
/// set for good. All late jobs plus the current head split the resource
/// equally.
#[derive(Debug, Clone)]
pub struct SrptPs {
    queue: RankedQueue<f64>,
    late: HashSet<JobId>,
    last_t: f64,
    epsilon: f64,
}

impl SrptPs {
    pub fn new(epsilon: f64) -> Self {
        Self {
            queue: RankedQueue::new(),
            late: HashSet::new(),
            last_t: 0.0,
            epsilon,
        }
    }

    fn update(&mut self, t: f64) {
        let delta = (t - self.last_t) / (1.0 + self.late.len() as f64);
        if let Some(remaining) = self.queue.head_key_mut() {
            *remaining -= delta;
        }
        // Estimate exhausted: once late, always late.
        while let Some((remaining, job)) = self.queue.head() {
            if remaining >= self.epsilon {
                break;
            }
            self.queue.pop_head();
            self.late.insert(job);
        }
        self.last_t = t;
    }
}

impl Policy for SrptPs {
    fn name(&self) -> &'static str {
        "SRPT+PS"
    }

    fn enqueue(&mut self, t: f64, job: JobId, estimated_size: f64) -> Result<(), SimulationError> {
        if self.queue.contains(job) || self.late.contains(&job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        self.update(t);
        self.queue.insert(estimated_size, job);
        Ok(())
    }

    fn dequeue(&mut self, t: f64, job: JobId) -> Result<(), SimulationError> {
        self.update(t);
        if self.late.remove(&job) {
            return Ok(());
        }
        match self.queue.remove(job) {
            Some(_) => Ok(()),
            None => Err(SimulationError::UnknownJob { job }),
        }
    }

    fn schedule(&mut self, t: f64) -> Allocation {
        self.update(t);
        let mut scheduled: Vec<JobId> = self.late.iter().copied().collect();
        if let Some((_, job)) = self.queue.head() {
            scheduled.push(job);
        }
        if scheduled.is_empty() {
            return Allocation::new();
        }
        let share = 1.0 / scheduled.len() as f64;
        scheduled.into_iter().map(|job| (job, share)).collect()
    }

    fn next_internal_event(&self) -> Option<f64> {
        // Time for the head's estimate to hit zero at its current rate.
        self.queue
            .head()
            .map(|(remaining, _)| remaining * (1.0 + self.late.len() as f64))
    }
}
