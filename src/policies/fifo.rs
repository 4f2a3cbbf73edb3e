//! First-in first-out.

use std::collections::VecDeque;

use super::Policy;
use crate::error::SimulationError;
use crate::models::{Allocation, JobId};

/// Serves the whole resource to the oldest admitted job.
///
/// Size estimates are ignored entirely, which makes FIFO a useful
/// baseline: estimation error cannot change its behavior.
#[derive(Debug, Clone, Default)]
pub struct Fifo {
    queue: VecDeque<JobId>,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for Fifo {
    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn enqueue(&mut self, _t: f64, job: JobId, _estimated_size: f64) -> Result<(), SimulationError> {
        if self.queue.contains(&job) {
            return Err(SimulationError::DuplicateJob { job });
        }
        self.queue.push_back(job);
        Ok(())
    }

    fn dequeue(&mut self, _t: f64, job: JobId) -> Result<(), SimulationError> {
        match self.queue.iter().position(|&j| j == job) {
            Some(at) => {
                self.queue.remove(at);
                Ok(())
            }
            None => Err(SimulationError::UnknownJob { job }),
        }
    }

    fn schedule(&mut self, _t: f64) -> Allocation {
        match self.queue.front() {
            Some(&job) => Allocation::from([(job, 1.0)]),
            None => Allocation::new(),
        }
    }
}
