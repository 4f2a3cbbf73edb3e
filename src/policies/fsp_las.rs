//! FSP with least-attained-service contention among late jobs.
//!
//! Runs the FSP virtual fair-sharing queue over estimated sizes,
//! discretized into ε quanta. Jobs crossing into lateness migrate into an
//! attained-service queue instead of a flat set: whenever any job is
//! late, the least-attained late bucket is served with equal shares,
//! which avoids the FIFO-induced unfairness of serving late jobs strictly
//! in lateness order.

use std::collections::{HashMap, HashSet};

use super::{ceil_quanta, quanta, AttainedQueue, Policy, RankedQueue};
use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// FSP virtual queue plus LAS late queue.
#[derive(Debug, Clone)]
pub struct FspLas {
    /// Virtual remaining work per job, in ε quanta; fair-shared on update.
    ///
    /// As in FSP, really-finished jobs stay here so the virtual schedule
    /// keeps its course.
    virtual_queue: RankedQueue<i64>,
    /// Jobs admitted and not yet really finished.
    running: HashSet<JobId>,
    /// Virtually finished but really unfinished.
    late: HashSet<JobId>,
    /// Late jobs bucketed by attained service.
    late_queue: AttainedQueue,
    /// Attained service per admitted job, in quanta.
    attained: HashMap<JobId, i64>,
    /// Snapshot of the last allocation, sorted by job id.
    scheduled: Vec<(JobId, f64)>,
    last_t: f64,
    epsilon: f64,
}

impl FspLas {
    pub fn new(epsilon: f64) -> Self {
        Self {
            virtual_queue: RankedQueue::new(),
            running: HashSet::new(),
            late: HashSet::new(),
            late_queue: AttainedQueue::new(),
            attained: HashMap::new(),
            scheduled: Vec::new(),
            last_t: 0.0,
            epsilon,
        }
    }

    /// Credits real attained service per the last allocation, then
    /// advances the virtual fair-sharing scheduler, migrating jobs whose
    /// virtual work is exhausted into the late queue.
    fn update(&mut self, t: f64) {
        let delta = quanta(t - self.last_t, self.epsilon);
        self.last_t = t;

        if delta > 0 {
            let scheduled = self.scheduled.clone();
            for (job, share) in scheduled {
                // Dequeued since the snapshot.
                let Some(&old_att) = self.attained.get(&job) else {
                    continue;
                };
                let work = ceil_quanta(delta as f64 * share);
                if self.late.contains(&job) {
                    self.late_queue.remove(job, old_att);
                    let new_att = self.late_queue.insert(job, old_att + work);
                    self.attained.insert(job, new_att);
                } else {
                    self.attained.insert(job, old_att + work);
                }
            }
        }

        if !self.virtual_queue.is_empty() {
            let fair_share = ceil_quanta(delta as f64 / self.virtual_queue.len() as f64);
            // One quantum of tolerance.
            let threshold = fair_share + 1;
            for (_, job) in self.virtual_queue.drain_head_while(|vrem| vrem <= threshold) {
                if self.running.contains(&job) {
                    self.late.insert(job);
                    let att = self.attained.get(&job).copied().unwrap_or(0);
                    let att = self.late_queue.insert(job, att);
                    self.attained.insert(job, att);
                }
            }
            if fair_share > 0 {
                self.virtual_queue.decay_all(fair_share);
            }
        }
    }
}

impl Policy for FspLas {
    fn name(&self) -> &'static str {
        "FSP+LAS"
    }

    fn enqueue(&mut self, t: f64, job: JobId, estimated_size: f64) -> Result<(), SimulationError> {
        if self.running.contains(&job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        // Age only the jobs already in the virtual queue.
        self.update(t);
        self.virtual_queue
            .insert(quanta(estimated_size, self.epsilon), job);
        self.running.insert(job);
        self.attained.insert(job, 0);
        Ok(())
    }

    fn dequeue(&mut self, _t: f64, job: JobId) -> Result<(), SimulationError> {
        // The job remains in the virtual scheduler, as in FSP.
        if !self.running.remove(&job) {
            return Err(SimulationError::UnknownJob { job });
        }
        let att = self.attained.remove(&job);
        if self.late.remove(&job) {
            let att = att.unwrap_or(0);
            if !self.late_queue.remove(job, att) {
                return Err(SimulationError::UnknownJob { job });
            }
        }
        Ok(())
    }

    fn schedule(&mut self, t: f64) -> Allocation {
        self.update(t);

        let allocation = if let Some((_, bucket)) = self.late_queue.first() {
            let share = 1.0 / bucket.len() as f64;
            bucket.iter().map(|&job| (job, share)).collect()
        } else if self.running.is_empty() {
            Allocation::new()
        } else {
            match self
                .virtual_queue
                .iter()
                .find(|(_, job)| self.running.contains(job))
            {
                Some(&(_, job)) => Allocation::from([(job, 1.0)]),
                None => Allocation::new(),
            }
        };

        let mut scheduled: Vec<(JobId, f64)> = allocation.iter().map(|(&j, &s)| (j, s)).collect();
        scheduled.sort_unstable_by_key(|&(job, _)| job);
        self.scheduled = scheduled;
        allocation
    }

    fn next_internal_event(&self) -> Option<f64> {
        let mut next: Option<f64> = None;
        // Time at which the virtual head finishes its fair share and a
        // job may become late.
        if let Some((vrem, _)) = self.virtual_queue.head() {
            next = Some(vrem as f64 * self.virtual_queue.len() as f64 * self.epsilon);
        }
        // Time at which the served late bucket catches up with the next.
        if let Some((first, second)) = self.late_queue.first_two_keys() {
            let serving = self.late_queue.first().map_or(0, |(_, jobs)| jobs.len());
            let catch_up = (second - first) as f64 * serving as f64 * self.epsilon;
            if next.map_or(true, |n| n > catch_up) {
                next = Some(catch_up);
            }
        }
        next
    }
}
