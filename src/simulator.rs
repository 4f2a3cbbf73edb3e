//! Event-driven simulation engine.
//!
//! Owns simulation time, the true remaining-work table and the event
//! heap; drives a policy through its lifecycle and reconstructs, from the
//! resource shares the policy allocates, the virtual time at which each
//! job's true work is exhausted.
//!
//! The engine is single-threaded and fully deterministic: given the same
//! workload and seed, the event sequence — including the resolution of
//! simultaneous events — replays identically. Repeated runs for variance
//! estimation are independent; each run gets a freshly built policy and
//! estimate sampler.
//!
//! # Example
//!
//! ```
//! use u_queuesim::{Job, PolicyKind, Simulator};
//!
//! let jobs = vec![Job::new(1, 0.0, 10.0), Job::new(2, 5.0, 10.0)];
//! let completions: Result<Vec<_>, _> = Simulator::new(PolicyKind::Ps)
//!     .run(&jobs)
//!     .unwrap()
//!     .collect();
//! let completions = completions.unwrap();
//! assert_eq!(completions[0].time, 15.0);
//! assert_eq!(completions[1].time, 20.0);
//! ```

use std::collections::{BinaryHeap, HashMap};

use log::{debug, trace};

use crate::error::SimulationError;
use crate::estimation::{SizeEstimation, SizeSampler};
use crate::models::{total_share, Allocation, Completion, Event, EventKind, Job, JobId};
use crate::policies::{Policy, PolicyKind, DEFAULT_EPSILON};
use crate::validation::{validate_jobs, ValidationError};

/// Simulation configuration: policy, estimation strategy, tolerance, seed.
///
/// # Example
///
/// ```
/// use u_queuesim::{PolicyKind, SizeEstimation, Simulator};
///
/// let sim = Simulator::new(PolicyKind::SrptPs)
///     .with_estimation(SizeEstimation::LogNormal { sigma: 0.5 })
///     .with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    policy: PolicyKind,
    estimation: SizeEstimation,
    epsilon: f64,
    seed: u64,
}

impl Simulator {
    /// Creates a simulator for the given policy with exact estimates and
    /// the default tolerance.
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            policy,
            estimation: SizeEstimation::Exact,
            epsilon: DEFAULT_EPSILON,
            seed: 0,
        }
    }

    /// Sets the size-estimation strategy.
    pub fn with_estimation(mut self, estimation: SizeEstimation) -> Self {
        self.estimation = estimation;
        self
    }

    /// Sets the floating-point tolerance for "effectively done" checks.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the seed for estimation-noise sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the workload and starts a run.
    ///
    /// The returned [`SimulationRun`] lazily yields one completion per
    /// job, in the order completions occur in simulated time. Malformed
    /// input (duplicate ids, negative or non-finite values, bad
    /// estimation parameters) is rejected here, before any event is
    /// processed.
    pub fn run(&self, jobs: &[Job]) -> Result<SimulationRun, Vec<ValidationError>> {
        validate_jobs(jobs)?;
        let sampler = self.estimation.sampler(self.seed).map_err(|e| vec![e])?;

        let mut events = BinaryHeap::with_capacity(jobs.len());
        for job in jobs {
            events.push(Event::new(
                job.arrival,
                EventKind::Arrival {
                    job: job.id,
                    size: job.size,
                },
            ));
        }

        debug!(
            "starting {} run: {} jobs, epsilon {}",
            self.policy.name(),
            jobs.len(),
            self.epsilon
        );
        Ok(SimulationRun {
            events,
            remaining: HashMap::with_capacity(jobs.len()),
            allocation: Allocation::new(),
            policy: self.policy.build(self.epsilon),
            sampler,
            last_t: 0.0,
            epsilon: self.epsilon,
            done: false,
        })
    }
}

/// A single in-progress simulation: a lazy, single-pass stream of
/// completions.
///
/// Yields `Ok(Completion)` per finished job. Any invariant violation
/// yields one `Err` and fuses the iterator: a failed run cannot be
/// resumed.
pub struct SimulationRun {
    events: BinaryHeap<Event>,
    /// True remaining work per admitted job. Changes in exactly one
    /// place: the elapsed-time debit at the top of the event loop.
    remaining: HashMap<JobId, f64>,
    /// Allocation in force since the previous event.
    allocation: Allocation,
    policy: Box<dyn Policy>,
    sampler: SizeSampler,
    last_t: f64,
    epsilon: f64,
    done: bool,
}

impl SimulationRun {
    /// Processes events until the next completion is emitted.
    fn advance(&mut self) -> Result<Option<Completion>, SimulationError> {
        while let Some(event) = self.events.pop() {
            let t = event.time;
            let delta = t - self.last_t;

            // Debit the work done since the previous event. This is the
            // only place true remaining work changes.
            for (&job, &share) in &self.allocation {
                let remaining = self
                    .remaining
                    .get_mut(&job)
                    .ok_or(SimulationError::UnknownJob { job })?;
                *remaining -= delta * share;
                if *remaining < -self.epsilon {
                    return Err(SimulationError::NegativeRemaining {
                        job,
                        remaining: *remaining,
                    });
                }
            }

            let completed = match event.kind {
                EventKind::Arrival { job, size } => {
                    trace!("t={t}: job {job} arrives, size {size}");
                    if self.remaining.insert(job, size).is_some() {
                        return Err(SimulationError::DuplicateJob { job });
                    }
                    let estimate = self.sampler.estimate(size)?;
                    self.policy.enqueue(t, job, estimate)?;
                    None
                }
                EventKind::Complete { job } => {
                    trace!("t={t}: job {job} completes");
                    if self.remaining.remove(&job).is_none() {
                        return Err(SimulationError::UnknownJob { job });
                    }
                    self.policy.dequeue(t, job)?;
                    Some(Completion::new(job, t))
                }
                EventKind::Internal => None,
            };

            self.allocation = self.policy.schedule(t);
            debug_assert!(total_share(&self.allocation) <= 1.0 + self.epsilon);

            // Wake-up the policy predicted for itself. Superfluous
            // internal events are harmless no-ops — the policy recomputes
            // purely from elapsed time — so pushing is skipped whenever
            // some event fires at or before the predicted instant. A
            // non-positive offset means the transition is already
            // integrated in the schedule above, so only strictly future
            // wake-ups enter the heap.
            if let Some(offset) = self.policy.next_internal_event() {
                let wake = t + offset;
                if offset > 0.0 && self.events.peek().map_or(true, |next| wake < next.time) {
                    self.events.push(Event::new(wake, EventKind::Internal));
                }
            }

            // Earliest candidate completion under the new allocation,
            // again pushed only if no queued event preempts it.
            if let Some((finish, job)) = self.next_completion(t)? {
                if self.events.peek().map_or(true, |next| next.time > finish) {
                    self.events
                        .push(Event::new(finish, EventKind::Complete { job }));
                }
            }

            self.last_t = t;
            if completed.is_some() {
                return Ok(completed);
            }
        }

        // Event stream exhausted: every admitted job must have completed.
        if !self.remaining.is_empty() {
            return Err(SimulationError::UnfinishedJobs {
                count: self.remaining.len(),
            });
        }
        Ok(None)
    }

    /// Minimal `t + remaining/share` over the allocated jobs, ties broken
    /// by job id.
    fn next_completion(&self, t: f64) -> Result<Option<(f64, JobId)>, SimulationError> {
        let mut best: Option<(f64, JobId)> = None;
        for (&job, &share) in &self.allocation {
            if share <= 0.0 {
                continue;
            }
            let remaining = self
                .remaining
                .get(&job)
                .copied()
                .ok_or(SimulationError::UnknownJob { job })?;
            let finish = t + remaining / share;
            let better = match best {
                None => true,
                Some((best_finish, best_job)) => {
                    finish < best_finish || (finish == best_finish && job < best_job)
                }
            };
            if better {
                best = Some((finish, job));
            }
        }
        Ok(best)
    }
}

impl Iterator for SimulationRun {
    type Item = Result<Completion, SimulationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(completion)) => Some(Ok(completion)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                debug!("aborting run: {error}");
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn run_jobs(kind: PolicyKind, jobs: &[(u64, f64, f64)]) -> Vec<Completion> {
        run_with(Simulator::new(kind), jobs)
    }

    fn run_with(sim: Simulator, jobs: &[(u64, f64, f64)]) -> Vec<Completion> {
        let jobs: Vec<Job> = jobs
            .iter()
            .map(|&(id, arrival, size)| Job::new(id, arrival, size))
            .collect();
        sim.run(&jobs)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn assert_completions(actual: &[Completion], expected: &[(f64, u64)]) {
        assert_eq!(actual.len(), expected.len(), "completion count");
        for (completion, &(time, id)) in actual.iter().zip(expected) {
            assert_eq!(completion.job, JobId(id));
            assert!(
                (completion.time - time).abs() < 1e-9,
                "job #{id}: completed at {}, expected {time}",
                completion.time
            );
        }
    }

    // ==================== Basic lifecycles ====================

    #[test]
    fn test_empty_workload_all_policies() {
        for kind in PolicyKind::ALL {
            assert!(run_jobs(kind, &[]).is_empty());
        }
    }

    #[test]
    fn test_single_job_all_policies() {
        for kind in PolicyKind::ALL {
            let completions = run_jobs(kind, &[(1, 0.0, 10.0)]);
            assert_completions(&completions, &[(10.0, 1)]);
        }
    }

    #[test]
    fn test_single_delayed_job_all_policies() {
        for kind in PolicyKind::ALL {
            let completions = run_jobs(kind, &[(1, 3.0, 10.0)]);
            assert_completions(&completions, &[(13.0, 1)]);
        }
    }

    // ==================== FIFO ====================

    #[test]
    fn test_fifo_two_jobs() {
        let completions = run_jobs(PolicyKind::Fifo, &[(1, 0.0, 10.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(10.0, 1), (20.0, 2)]);
    }

    #[test]
    fn test_fifo_two_delayed() {
        let completions = run_jobs(PolicyKind::Fifo, &[(1, 0.0, 10.0), (2, 5.0, 10.0)]);
        assert_completions(&completions, &[(10.0, 1), (20.0, 2)]);
    }

    // ==================== PS ====================

    #[test]
    fn test_ps_two_equal_jobs() {
        let completions = run_jobs(PolicyKind::Ps, &[(1, 0.0, 10.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(20.0, 1), (20.0, 2)]);
    }

    #[test]
    fn test_ps_two_delayed() {
        // Job 1 runs alone 0..5, then shares until finishing at 15;
        // job 2 then runs alone until 20.
        let completions = run_jobs(PolicyKind::Ps, &[(1, 0.0, 10.0), (2, 5.0, 10.0)]);
        assert_completions(&completions, &[(15.0, 1), (20.0, 2)]);
    }

    // ==================== SRPT ====================

    #[test]
    fn test_srpt_two_jobs() {
        let completions = run_jobs(PolicyKind::Srpt, &[(1, 0.0, 20.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(10.0, 2), (30.0, 1)]);
    }

    #[test]
    fn test_srpt_preempts_delayed_smaller_job() {
        let completions = run_jobs(PolicyKind::Srpt, &[(1, 0.0, 20.0), (2, 5.0, 10.0)]);
        assert_completions(&completions, &[(15.0, 2), (30.0, 1)]);
    }

    #[test]
    fn test_srpt_starves_long_job_until_queue_drains() {
        let completions = run_jobs(
            PolicyKind::Srpt,
            &[
                (1, 0.0, 15.0),
                (2, 0.0, 10.0),
                (3, 10.0, 10.0),
                (4, 20.0, 10.0),
            ],
        );
        assert_completions(&completions, &[(10.0, 2), (20.0, 3), (30.0, 4), (45.0, 1)]);
    }

    // ==================== FSP ====================

    #[test]
    fn test_fsp_two_jobs() {
        let completions = run_jobs(PolicyKind::Fsp, &[(1, 0.0, 20.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(10.0, 2), (30.0, 1)]);
    }

    #[test]
    fn test_fsp_two_delayed() {
        let completions = run_jobs(PolicyKind::Fsp, &[(1, 0.0, 20.0), (2, 5.0, 10.0)]);
        assert_completions(&completions, &[(15.0, 2), (30.0, 1)]);
    }

    #[test]
    fn test_fsp_does_not_starve_long_job() {
        // Same workload where SRPT defers job 1 to the very end: FSP
        // finishes it second, at its virtual PS completion order.
        let completions = run_jobs(
            PolicyKind::Fsp,
            &[
                (1, 0.0, 15.0),
                (2, 0.0, 10.0),
                (3, 10.0, 10.0),
                (4, 20.0, 10.0),
            ],
        );
        assert_completions(&completions, &[(10.0, 2), (25.0, 1), (35.0, 3), (45.0, 4)]);
    }

    #[test]
    fn test_fsp_order_only_estimation_error_is_harmless() {
        // Swapped fixed estimates keep the relative order of the two
        // jobs, so FSP still produces the oracle-optimal schedule.
        let sim = Simulator::new(PolicyKind::Fsp)
            .with_estimation(SizeEstimation::Fixed(vec![15.0, 20.0]));
        let completions = run_with(sim, &[(1, 0.0, 10.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(10.0, 1), (20.0, 2)]);
    }

    // ==================== Estimation-driven behavior ====================

    #[test]
    fn test_srpt_with_swapped_estimates_serves_wrong_job_first() {
        // Job 1 is estimated smaller but is truly larger: SRPT trusts the
        // estimate, runs job 1 to its true completion, then job 2.
        let sim = Simulator::new(PolicyKind::Srpt)
            .with_estimation(SizeEstimation::Fixed(vec![5.0, 10.0]));
        let completions = run_with(sim, &[(1, 0.0, 20.0), (2, 0.0, 10.0)]);
        assert_completions(&completions, &[(20.0, 1), (30.0, 2)]);
    }

    #[test]
    fn test_estimation_exhaustion_aborts_run() {
        let sim =
            Simulator::new(PolicyKind::Srpt).with_estimation(SizeEstimation::Fixed(vec![5.0]));
        let jobs = vec![Job::new(1, 0.0, 10.0), Job::new(2, 1.0, 10.0)];
        let results: Vec<_> = sim.run(&jobs).unwrap().collect();
        assert!(results
            .iter()
            .any(|r| r == &Err(SimulationError::EstimatesExhausted)));
    }

    #[test]
    fn test_noisy_estimation_is_reproducible() {
        let jobs: Vec<(u64, f64, f64)> = (0..20).map(|i| (i, i as f64 * 0.7, 5.0)).collect();
        let sim = Simulator::new(PolicyKind::SrptLas)
            .with_estimation(SizeEstimation::LogNormal { sigma: 1.0 })
            .with_seed(7);
        let first = run_with(sim.clone(), &jobs);
        let second = run_with(sim, &jobs);
        assert_eq!(first, second);
    }

    // ==================== Malformed input ====================

    #[test]
    fn test_duplicate_ids_rejected_before_run() {
        let jobs = vec![Job::new(1, 0.0, 10.0), Job::new(1, 1.0, 5.0)];
        assert!(Simulator::new(PolicyKind::Ps).run(&jobs).is_err());
    }

    #[test]
    fn test_negative_size_rejected_before_run() {
        let jobs = vec![Job::new(1, 0.0, -10.0)];
        assert!(Simulator::new(PolicyKind::Ps).run(&jobs).is_err());
    }

    #[test]
    fn test_bad_estimation_parameter_rejected_before_run() {
        let sim = Simulator::new(PolicyKind::Ps)
            .with_estimation(SizeEstimation::LogNormal { sigma: -0.5 });
        assert!(sim.run(&[Job::new(1, 0.0, 1.0)]).is_err());
    }

    // ==================== Cross-policy properties ====================

    fn random_workload(seed: u64, n: usize) -> Vec<(u64, f64, f64)> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n as u64)
            .map(|id| {
                let arrival: f64 = rng.random_range(0.0..20.0);
                let size: f64 = rng.random_range(1.0..10.0);
                (id, arrival, size)
            })
            .collect()
    }

    #[test]
    fn test_conservation_every_job_completes_exactly_once() {
        let jobs = random_workload(11, 40);
        for kind in PolicyKind::ALL {
            let sim = Simulator::new(kind)
                .with_estimation(SizeEstimation::LogNormal { sigma: 0.8 })
                .with_seed(3);
            let completions = run_with(sim, &jobs);

            let expected: HashSet<JobId> = jobs.iter().map(|&(id, _, _)| JobId(id)).collect();
            let emitted: HashSet<JobId> = completions.iter().map(|c| c.job).collect();
            assert_eq!(completions.len(), jobs.len(), "{}: duplicates", kind.name());
            assert_eq!(emitted, expected, "{}: missing ids", kind.name());
        }
    }

    #[test]
    fn test_completions_never_precede_arrivals() {
        let jobs = random_workload(5, 30);
        for kind in PolicyKind::ALL {
            let sim = Simulator::new(kind)
                .with_estimation(SizeEstimation::normal(0.5))
                .with_seed(9);
            let completions = run_with(sim, &jobs);
            for completion in &completions {
                let (_, arrival, _) = jobs[completion.job.0 as usize];
                assert!(
                    completion.time >= arrival - 1e-9,
                    "{}: job {} completed before arriving",
                    kind.name(),
                    completion.job
                );
            }
        }
    }

    #[test]
    fn test_completion_times_are_non_decreasing_in_emission_order() {
        let jobs = random_workload(23, 30);
        for kind in PolicyKind::ALL {
            let completions = run_jobs(kind, &jobs);
            for pair in completions.windows(2) {
                assert!(pair[0].time <= pair[1].time + 1e-6, "{}", kind.name());
            }
        }
    }

    /// Work conservation bounds every sojourn by the busy period, so with
    /// all jobs arriving at once no hybrid can degrade a job — or the
    /// mean — beyond the total work, no matter how adversarial the
    /// estimation error is. Plain PS gives every job at least its own
    /// size as sojourn, which caps the ratio at the job count.
    #[test]
    fn test_hybrids_bound_starvation_under_adversarial_error() {
        const K: f64 = 3.0; // error multipliers within [1/k, k]
        let n = 16;
        let mut rng = StdRng::seed_from_u64(77);

        let jobs: Vec<(u64, f64, f64)> = (0..n as u64)
            .map(|id| (id, 0.0, rng.random_range(1.0..10.0)))
            .collect();
        let total_work: f64 = jobs.iter().map(|&(_, _, size)| size).sum();
        let estimates: Vec<f64> = jobs
            .iter()
            .map(|&(_, _, size)| size * rng.random_range(1.0 / K..K))
            .collect();

        let ps_mean = mean_sojourn(&run_jobs(PolicyKind::Ps, &jobs), &jobs);

        for kind in [
            PolicyKind::SrptPs,
            PolicyKind::FspPs,
            PolicyKind::SrptLas,
            PolicyKind::FspLas,
        ] {
            let sim = Simulator::new(kind)
                .with_estimation(SizeEstimation::Fixed(estimates.clone()));
            let completions = run_with(sim, &jobs);

            // No job outlives the busy period.
            for completion in &completions {
                assert!(
                    completion.time <= total_work + 1e-6,
                    "{}: job {} starved past the busy period",
                    kind.name(),
                    completion.job
                );
            }
            // Mean degradation versus PS stays bounded by the job count.
            let mean = mean_sojourn(&completions, &jobs);
            assert!(
                mean <= n as f64 * ps_mean,
                "{}: mean sojourn {mean} vs PS {ps_mean}",
                kind.name()
            );
        }
    }

    fn mean_sojourn(completions: &[Completion], jobs: &[(u64, f64, f64)]) -> f64 {
        let total: f64 = completions
            .iter()
            .map(|c| {
                let (_, arrival, _) = jobs[c.job.0 as usize];
                c.time - arrival
            })
            .sum();
        total / completions.len() as f64
    }
}
