//! Sojourn-time metrics.
//!
//! Reduces one simulation run to standard single-queue performance
//! indicators.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Mean Sojourn | mean(completion − arrival) |
//! | Max Sojourn | largest single sojourn |
//! | Mean Slowdown | mean(sojourn / true size) |
//! | Max Slowdown | largest single slowdown |
//!
//! # Reference
//! Harchol-Balter (2013), "Performance Modeling and Design of Computer
//! Systems", Ch. 28-33

use std::collections::HashMap;

use crate::models::{Completion, Job, JobId};

/// Per-run sojourn statistics.
///
/// Zero-size jobs are excluded from the slowdown aggregates.
#[derive(Debug, Clone)]
pub struct SojournKpi {
    /// Jobs counted (completions with a matching input job).
    pub job_count: usize,
    /// Mean time from arrival to completion.
    pub mean_sojourn: f64,
    /// Largest single sojourn.
    pub max_sojourn: f64,
    /// Mean sojourn divided by true size.
    pub mean_slowdown: f64,
    /// Largest single slowdown.
    pub max_slowdown: f64,
}

impl SojournKpi {
    /// Computes sojourn statistics from the input jobs and the
    /// completions of one run.
    pub fn calculate(jobs: &[Job], completions: &[Completion]) -> Self {
        let by_id: HashMap<JobId, &Job> = jobs.iter().map(|job| (job.id, job)).collect();

        let mut job_count = 0;
        let mut total_sojourn = 0.0;
        let mut max_sojourn: f64 = 0.0;
        let mut slowdown_count = 0;
        let mut total_slowdown = 0.0;
        let mut max_slowdown: f64 = 0.0;

        for completion in completions {
            let Some(job) = by_id.get(&completion.job) else {
                continue;
            };
            job_count += 1;

            let sojourn = completion.time - job.arrival;
            total_sojourn += sojourn;
            max_sojourn = max_sojourn.max(sojourn);

            if job.size > 0.0 {
                let slowdown = sojourn / job.size;
                slowdown_count += 1;
                total_slowdown += slowdown;
                max_slowdown = max_slowdown.max(slowdown);
            }
        }

        let mean_sojourn = if job_count == 0 {
            0.0
        } else {
            total_sojourn / job_count as f64
        };
        let mean_slowdown = if slowdown_count == 0 {
            0.0
        } else {
            total_slowdown / slowdown_count as f64
        };

        Self {
            job_count,
            mean_sojourn,
            max_sojourn,
            mean_slowdown,
            max_slowdown,
        }
    }
}
