//! Per-query lifecycle tracking.

use serde::Serialize;

/// Stage a query has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Idle,
    FieldBuilt,
    Superposed,
    Scored,
    Learned,
    Emerged,
}

impl QueryPhase {
    /// Whether a query may move from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::FieldBuilt)
                | (Self::FieldBuilt, Self::Superposed)
                | (Self::Superposed, Self::Scored)
                | (Self::Scored, Self::Learned)
                | (Self::Learned, Self::Emerged | Self::Idle)
                | (Self::Emerged, Self::Idle)
        )
    }
}

/// State machine for one query: `Idle → FieldBuilt → Superposed → Scored →
/// Learned → (Emerged) → Idle`.
#[derive(Debug, Clone)]
pub struct QueryCycle {
    phase: QueryPhase,
    visited: Vec<QueryPhase>,
}

impl Default for QueryCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCycle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: QueryPhase::Idle,
            visited: vec![QueryPhase::Idle],
        }
    }

    #[must_use]
    pub const fn phase(&self) -> QueryPhase {
        self.phase
    }

    /// Phases entered so far, in order.
    #[must_use]
    pub fn visited(&self) -> &[QueryPhase] {
        &self.visited
    }

    /// Move to `next`. Illegal transitions are logged and refused.
    pub fn advance(&mut self, next: QueryPhase) -> bool {
        let legal = self.phase.can_advance_to(next);
        if !legal {
            tracing::error!(from = ?self.phase, to = ?next, "illegal query phase transition");
            debug_assert!(legal, "illegal query phase transition {:?} -> {next:?}", self.phase);
            return false;
        }
        tracing::trace!(from = ?self.phase, to = ?next, "query phase");
        self.phase = next;
        self.visited.push(next);
        true
    }

    /// Return to `Idle` from any phase after a failure.
    pub fn abort(&mut self) {
        if self.phase != QueryPhase::Idle {
            tracing::trace!(from = ?self.phase, "query aborted");
            self.phase = QueryPhase::Idle;
            self.visited.push(QueryPhase::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_with_emergence() {
        let mut cycle = QueryCycle::new();
        for next in [
            QueryPhase::FieldBuilt,
            QueryPhase::Superposed,
            QueryPhase::Scored,
            QueryPhase::Learned,
            QueryPhase::Emerged,
            QueryPhase::Idle,
        ] {
            assert!(cycle.advance(next), "{next:?}");
        }
        assert_eq!(cycle.visited().len(), 7);
    }

    #[test]
    fn test_emergence_is_optional() {
        assert!(QueryPhase::Learned.can_advance_to(QueryPhase::Idle));
        assert!(!QueryPhase::Scored.can_advance_to(QueryPhase::Emerged));
        assert!(!QueryPhase::Idle.can_advance_to(QueryPhase::Learned));
    }

    #[test]
    fn test_abort_returns_to_idle() {
        let mut cycle = QueryCycle::new();
        assert!(cycle.advance(QueryPhase::FieldBuilt));
        cycle.abort();
        assert_eq!(cycle.phase(), QueryPhase::Idle);
        assert!(cycle.advance(QueryPhase::FieldBuilt));
    }
}
