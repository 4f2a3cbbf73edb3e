//! Resource allocation produced by a policy.

use std::collections::HashMap;

use crate::models::JobId;

/// Map from job id to the fraction of the resource it receives.
///
/// Shares are in `(0, 1]` and must sum to at most `1 + ε`. Jobs absent
/// from the map receive no service until the next recomputation.
pub type Allocation = HashMap<JobId, f64>;

/// Sum of all shares in an allocation.
pub fn total_share(allocation: &Allocation) -> f64 {
    allocation.values().sum()
}
