//! Fair sojourn protocol.
//!
//! FSP runs a *virtual* processor-sharing scheduler over estimated sizes
//! and serializes real service in virtual completion order: the whole
//! resource goes to the admitted job that would finish first under PS.
//! With exact estimates this dominates PS on every job's sojourn time.
//!
//! When a job's virtual work is exhausted but its true work is not (an
//! estimation-error symptom), it is *late*. Base FSP serves late jobs
//! exclusively, first-late-first-served; the fair-late variant splits the
//! resource equally among all late jobs instead, so one badly
//! underestimated job cannot monopolize the resource ahead of the others.
//!
//! # Reference
//! Friedman & Henderson (2003), "Fairness and Efficiency in Web Server
//! Protocols"

use std::collections::HashSet;

use super::{Policy, RankedQueue};
use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// Fair sojourn protocol over estimated sizes.
#[derive(Debug, Clone)]
pub struct Fsp {
    /// Virtual remaining work per job, fair-shared on every update.
    ///
    /// Jobs stay in the virtual queue after real completion: their virtual
    /// share must keep draining exactly as it would have, or the relative
    /// order of the remaining jobs drifts.
    virtual_queue: RankedQueue<f64>,
    /// Jobs admitted and not yet really finished.
    running: HashSet<JobId>,
    /// Virtually finished but really unfinished, in lateness onset order.
    late: Vec<JobId>,
    /// Equal split among late jobs instead of first-late-first-served.
    share_late: bool,
    last_t: f64,
    epsilon: f64,
}

impl Fsp {
    /// Base FSP: late jobs served in lateness order.
    pub fn new(epsilon: f64) -> Self {
        Self {
            virtual_queue: RankedQueue::new(),
            running: HashSet::new(),
            late: Vec::new(),
            share_late: false,
            last_t: 0.0,
            epsilon,
        }
    }

    /// FSP+PS: processor sharing among late jobs.
    pub fn fair_late(epsilon: f64) -> Self {
        Self {
            share_late: true,
            ..Self::new(epsilon)
        }
    }

    /// Advances the virtual scheduler: distributes the elapsed time
    /// equally over the virtual queue and retires entries whose virtual
    /// work is exhausted, marking the really-unfinished ones late.
    fn update(&mut self, t: f64) {
        let delta = t - self.last_t;
        if !self.virtual_queue.is_empty() {
            let fair_share = delta / self.virtual_queue.len() as f64;
            let threshold = fair_share + self.epsilon;
            for (_, job) in self.virtual_queue.drain_head_while(|vrem| vrem <= threshold) {
                if self.running.contains(&job) {
                    self.late.push(job);
                }
            }
            if fair_share > 0.0 {
                self.virtual_queue.decay_all(fair_share);
            }
        }
        self.last_t = t;
    }
}

impl Policy for Fsp {
    fn name(&self) -> &'static str {
        if self.share_late {
            "FSP+PS"
        } else {
            "FSP"
        }
    }

    fn enqueue(&mut self, t: f64, job: JobId, estimated_size: f64) -> Result<(), SimulationError> {
        if self.running.contains(&job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        // Age only the jobs already in the virtual queue.
        self.update(t);
        self.virtual_queue.insert(estimated_size, job);
        self.running.insert(job);
        Ok(())
    }

    fn dequeue(&mut self, _t: f64, job: JobId) -> Result<(), SimulationError> {
        // The job remains in the virtual scheduler; see `virtual_queue`.
        if !self.running.remove(&job) {
            return Err(SimulationError::UnknownJob { job });
        }
        if let Some(at) = self.late.iter().position(|&j| j == job) {
            self.late.remove(at);
        }
        Ok(())
    }

    fn schedule(&mut self, t: f64) -> Allocation {
        self.update(t);

        if !self.late.is_empty() {
            if self.share_late {
                let share = 1.0 / self.late.len() as f64;
                return self.late.iter().map(|&job| (job, share)).collect();
            }
            return Allocation::from([(self.late[0], 1.0)]);
        }

        if self.running.is_empty() {
            return Allocation::new();
        }
        match self
            .virtual_queue
            .iter()
            .find(|(_, job)| self.running.contains(job))
        {
            Some(&(_, job)) => Allocation::from([(job, 1.0)]),
            None => Allocation::new(),
        }
    }

    fn next_internal_event(&self) -> Option<f64> {
        // Time until the virtual head finishes its fair share.
        self.virtual_queue
            .head()
            .map(|(vrem, _)| vrem * self.virtual_queue.len() as f64)
    }
}
