//! Aggregate operation counters for the knowledge store.
//!
//! Plain single-threaded counters owned by the store; a snapshot can be
//! read at any time via [`crate::kb::KnowledgeBase::metrics`].

/// Counters covering the store's lifecycle operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KbMetrics {
    /// External assertions received (facts and rules).
    pub assertions: u64,
    /// Duplicate facts that merged into an existing entry.
    pub fact_merges: u64,
    /// Duplicate rules that merged into an existing entry.
    pub rule_merges: u64,
    /// Facts created by forward chaining.
    pub derived_facts: u64,
    /// Rules created by forward chaining (partial specializations).
    pub derived_rules: u64,
    /// Forward-chaining attempts (one per fact/rule pairing).
    pub inference_attempts: u64,
    /// Attempts whose unification succeeded.
    pub inference_successes: u64,
    /// Retractions that cleared an asserted flag.
    pub retractions: u64,
    /// Retractions ignored (absent, derived-only, or already retracted).
    pub retractions_ignored: u64,
    /// Facts deleted by cascading removal.
    pub fact_removals: u64,
    /// Rules deleted by cascading removal.
    pub rule_removals: u64,
}

impl KbMetrics {
    /// Create a metrics block with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
