//! Baseline tracking across poll cycles.

use crate::config::BaselinePolicy;
use crate::entries::Snapshot;
use crate::reconcile::diff::Diff;

/// Holds the last published snapshot.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    baseline: Snapshot,
    policy: BaselinePolicy,
}

impl Reconciler {
    /// Start from an empty baseline.
    pub fn new(policy: BaselinePolicy) -> Self {
        Self {
            baseline: Snapshot::new(),
            policy,
        }
    }

    /// Start from a known published state.
    pub fn with_baseline(policy: BaselinePolicy, baseline: Snapshot) -> Self {
        Self { baseline, policy }
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn policy(&self) -> BaselinePolicy {
        self.policy
    }

    /// Changes needed to publish `next`.
    pub fn diff(&self, next: &Snapshot) -> Diff {
        Diff::between(&self.baseline, next)
    }

    /// Record the outcome of publishing `next`.
    ///
    /// Returns whether `next` became the baseline.
    pub fn settle(&mut self, next: Snapshot, exported: bool) -> bool {
        let adopt = exported || self.policy == BaselinePolicy::Always;
        if adopt {
            self.baseline = next;
        }
        adopt
    }
}
