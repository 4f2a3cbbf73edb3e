//! Input validation for simulation workloads.
//!
//! Checks structural integrity of the job list and the estimation
//! configuration before a run starts. Detects:
//! - Duplicate job IDs
//! - Negative arrival times or sizes
//! - Non-finite arrival times or sizes
//! - Invalid estimation parameters (negative or non-finite σ / factor)
//!
//! The simulator is not responsible for recovering from a bad workload,
//! only for rejecting it deterministically before any event is processed.

use std::collections::HashSet;

use crate::models::Job;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two jobs share the same ID.
    DuplicateId,
    /// A job arrives before time zero.
    NegativeTime,
    /// A job has negative size.
    NegativeSize,
    /// An arrival time or size is NaN or infinite.
    NonFiniteValue,
    /// An estimation strategy parameter is out of range.
    InvalidEstimationParameter,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a workload before simulation.
///
/// Checks:
/// 1. No duplicate job IDs
/// 2. All arrival times and sizes are finite
/// 3. All arrival times and sizes are non-negative
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_jobs(jobs: &[Job]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for job in jobs {
        if !seen.insert(job.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.id),
            ));
        }

        if !job.arrival.is_finite() || !job.size.is_finite() {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonFiniteValue,
                format!("Job {} has a non-finite arrival time or size", job.id),
            ));
            continue;
        }

        if job.arrival < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeTime,
                format!("Job {} arrives at negative time {}", job.id, job.arrival),
            ));
        }

        if job.size < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeSize,
                format!("Job {} has negative size {}", job.id, job.size),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
