use serde::{Deserialize, Serialize};

/// Derived dashboard counters for one owner.
///
/// Recomputed from repository state on every relevant change and replaced
/// wholesale; never persisted or mutated in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub documents_processed: i64,
    pub issues_detected: i64,
    /// Rounded mean of the non-null analysis compliance scores; 0 when none
    /// are scored yet.
    pub compliance_score: i32,
    pub active_analyses: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let stats = AggregateStats::default();
        assert_eq!(stats.documents_processed, 0);
        assert_eq!(stats.compliance_score, 0);
    }
}
