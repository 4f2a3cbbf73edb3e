//! Least attained service.
//!
//! Serves the jobs that have received the least service so far, splitting
//! the resource equally within that group. Needs no size information at
//! all: small jobs finish while their attained service is still low, and
//! long jobs converge to sharing the resource among themselves.
//!
//! Attained service is tracked in ε-sized quanta and buckets within one
//! quantum are merged (see [`AttainedQueue`]), so two jobs that have
//! received the same service up to rounding are tied rather than
//! oscillating around each other.
//!
//! # Reference
//! Rai, Urvoy-Keller & Biersack (2003)

use std::collections::{HashMap, HashSet};

use super::{ceil_quanta, quanta, AttainedQueue, Policy};
use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// The bucket granted service by the last `schedule` call.
#[derive(Debug, Clone)]
struct ScheduledBucket {
    att: i64,
    share: f64,
    jobs: HashSet<JobId>,
}

/// Least attained service over ε-coalesced service buckets.
#[derive(Debug, Clone)]
pub struct Las {
    /// All admitted jobs, bucketed by attained service quanta.
    queue: AttainedQueue,
    /// Attained service per admitted job, in quanta.
    attained: HashMap<JobId, i64>,
    /// Snapshot of the last allocation, applied on the next update.
    scheduled: Option<ScheduledBucket>,
    last_t: f64,
    epsilon: f64,
}

impl Las {
    pub fn new(epsilon: f64) -> Self {
        Self {
            queue: AttainedQueue::new(),
            attained: HashMap::new(),
            scheduled: None,
            last_t: 0.0,
            epsilon,
        }
    }

    /// Credits the service granted since the last update to the bucket
    /// that was scheduled, moving it to its new attained level.
    fn update(&mut self, t: f64) {
        let delta = quanta(t - self.last_t, self.epsilon);
        self.last_t = t;
        if delta == 0 {
            return;
        }
        let Some(bucket) = &self.scheduled else {
            return;
        };

        // Jobs dequeued since the snapshot are gone from `attained`.
        let survivors: HashSet<JobId> = bucket
            .jobs
            .iter()
            .copied()
            .filter(|job| self.attained.contains_key(job))
            .collect();
        if survivors.is_empty() {
            return;
        }

        for &job in &survivors {
            self.queue.remove(job, bucket.att);
        }
        let new_att = bucket.att + ceil_quanta(bucket.share * delta as f64);
        let new_att = self.queue.insert_set(&survivors, new_att);
        for &job in &survivors {
            self.attained.insert(job, new_att);
        }
    }
}

impl Policy for Las {
    fn name(&self) -> &'static str {
        "LAS"
    }

    fn enqueue(&mut self, _t: f64, job: JobId, _estimated_size: f64) -> Result<(), SimulationError> {
        if self.attained.contains_key(&job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        self.queue.insert_exact(job, 0);
        self.attained.insert(job, 0);
        Ok(())
    }

    fn dequeue(&mut self, _t: f64, job: JobId) -> Result<(), SimulationError> {
        let att = self
            .attained
            .remove(&job)
            .ok_or(SimulationError::UnknownJob { job })?;
        if !self.queue.remove(job, att) {
            return Err(SimulationError::UnknownJob { job });
        }
        Ok(())
    }

    fn schedule(&mut self, t: f64) -> Allocation {
        self.update(t);

        let head = self
            .queue
            .first()
            .map(|(att, jobs)| (att, jobs.clone()));
        match head {
            Some((att, jobs)) => {
                let share = 1.0 / jobs.len() as f64;
                let allocation = jobs.iter().map(|&job| (job, share)).collect();
                self.scheduled = Some(ScheduledBucket { att, share, jobs });
                allocation
            }
            None => {
                self.scheduled = None;
                Allocation::new()
            }
        }
    }

    fn next_internal_event(&self) -> Option<f64> {
        // Time for the served bucket to catch up with the next one.
        let (first, second) = self.queue.first_two_keys()?;
        let serving = self.queue.first().map_or(0, |(_, jobs)| jobs.len());
        Some((second - first) as f64 * serving as f64 * self.epsilon)
    }
}
