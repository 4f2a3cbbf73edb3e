//! Single-resource queueing simulator for scheduling under noisy size
//! estimates.
//!
//! Models one shared resource (e.g. a CPU) processing a stream of jobs
//! with known arrival times and true sizes, under a scheduling discipline
//! that only sees a noisy *estimate* of each job's size. The event-driven
//! engine tracks true remaining work independently of the policy's
//! estimated bookkeeping, so the effect of estimation error on sojourn
//! times can be measured in isolation.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Job`, `JobId`, `Completion`, `Event`,
//!   `Allocation`
//! - **`policies`**: The scheduling state machines — FIFO, PS, SRPT, FSP,
//!   LAS and the late-job hybrids bounding estimation-error unfairness
//! - **`estimation`**: Size-estimation strategies (oracle, log-normal and
//!   normal multiplicative noise, fixed replay)
//! - **`simulator`**: The event-driven engine and its lazy completion
//!   stream
//! - **`validation`**: Workload integrity checks (duplicate IDs, negative
//!   or non-finite values)
//! - **`kpi`**: Sojourn and slowdown statistics per run
//!
//! # Example
//!
//! ```
//! use u_queuesim::{Job, PolicyKind, Simulator, SizeEstimation};
//!
//! let jobs = vec![Job::new(1, 0.0, 20.0), Job::new(2, 5.0, 10.0)];
//! let completions: Result<Vec<_>, _> = Simulator::new(PolicyKind::Srpt)
//!     .with_estimation(SizeEstimation::Exact)
//!     .run(&jobs)
//!     .unwrap()
//!     .collect();
//! let completions = completions.unwrap();
//!
//! // SRPT preempts for the smaller job.
//! assert_eq!(completions[0].time, 15.0);
//! assert_eq!(completions[1].time, 30.0);
//! ```
//!
//! # References
//!
//! - Harchol-Balter (2013), "Performance Modeling and Design of Computer
//!   Systems"
//! - Friedman & Henderson (2003), "Fairness and Efficiency in Web Server
//!   Protocols"
//! - Rai, Urvoy-Keller & Biersack (2003), "Analysis of LAS Scheduling for
//!   Job Size Distributions with High Variance"
//! - Dell'Amico, Carra & Michiardi (2014), "Revisiting Size-Based
//!   Scheduling with Estimated Job Sizes"

pub mod error;
pub mod estimation;
pub mod kpi;
pub mod models;
pub mod policies;
pub mod simulator;
pub mod validation;

pub use error::SimulationError;
pub use estimation::SizeEstimation;
pub use kpi::SojournKpi;
pub use models::{Allocation, Completion, Event, EventKind, Job, JobId};
pub use policies::{Policy, PolicyKind, DEFAULT_EPSILON};
pub use simulator::{SimulationRun, Simulator};
pub use validation::{validate_jobs, ValidationError, ValidationErrorKind};
