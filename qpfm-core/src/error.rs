//! Error types for the probability field memory engine.
//!
//! Each message states what went wrong, what was expected, and how to fix it,
//! so that a failure read from a log is actionable without opening the code.
//! Degenerate numeric situations (empty candidate sets, zero denominators)
//! are never errors; they degrade to neutral values instead.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = QpfmError> = std::result::Result<T, E>;

/// Errors surfaced by the engine's public operations.
#[derive(Debug, Error)]
pub enum QpfmError {
    /// A memory item or query was rejected before touching shared state.
    #[error(
        "Input '{id}' rejected: {reason}\n  Expected: items with a non-empty id, coordinates inside [0,1]^3 and a complete harmonic signature; queries with confidence, exploration and urgency finite in [0,1]\n  Suggestion: Recompute coordinates with the coordinate mapper, fill every signature field, and clamp query knobs before submitting\n  Example: MemoryQuery::discovery().with_confidence(0.8).with_exploration(0.3)"
    )]
    Validation {
        /// Identifier of the rejected item, or `<query>` for a query.
        id: String,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// The repository collaborator could not supply candidate items.
    #[error(
        "Candidate memories unavailable\n  Expected: Repository to return the candidate set\n  Suggestion: Inspect the repository error and retry once it recovers\n  Example: engine.query(MemoryQuery::discovery()) after the repository is reachable"
    )]
    CandidatesUnavailable {
        #[source]
        /// Underlying repository failure.
        source: RepositoryError,
    },

    /// The repository collaborator refused or failed to store an item.
    #[error(
        "Memory '{id}' could not be stored\n  Expected: Repository to accept the new item\n  Suggestion: Inspect the repository error and retry the store once it recovers\n  Example: engine.store(item) after the repository is writable"
    )]
    StoreFailed {
        /// Identifier of the item being stored.
        id: String,
        #[source]
        /// Underlying repository failure.
        source: RepositoryError,
    },

    /// The query ran past its urgency-derived deadline.
    #[error(
        "Query exceeded its deadline during {phase} ({elapsed:?} > {budget:?})\n  Expected: Query to complete within the urgency budget\n  Suggestion: Lower the urgency or raise performance_targets.query_deadline_ms\n  Example: MemoryQuery::discovery().with_urgency(0.2)"
    )]
    DeadlineExceeded {
        /// Pipeline phase in which the deadline was detected.
        phase: &'static str,
        /// Time spent before the check.
        elapsed: Duration,
        /// Budget derived from the query's urgency.
        budget: Duration,
    },

    /// A lookup referenced a memory id the repository does not know.
    #[error(
        "Memory '{id}' not found\n  Expected: Id of a previously stored memory\n  Suggestion: Store the memory first or check the id for typos\n  Example: engine.store(item)?; engine.find_similar(&item_id, &SimilarityOptions::default())"
    )]
    UnknownMemory {
        /// Identifier that was looked up.
        id: String,
    },

    /// Engine configuration was malformed or out of range.
    #[error(
        "Invalid engine configuration: {reason}\n  Expected: Rates in [0,1], positive deadlines and cascade depths\n  Suggestion: Start from config/default.toml and adjust one knob at a time\n  Example: EngineConfig::from_toml_str(include_str!(\"config/default.toml\"))"
    )]
    Configuration {
        /// Description of the offending setting.
        reason: String,
    },
}

impl QpfmError {
    pub(crate) fn validation(id: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// True when the failure came from the repository rather than the query itself.
    #[must_use]
    pub const fn is_candidates_unavailable(&self) -> bool {
        matches!(self, Self::CandidatesUnavailable { .. })
    }
}

impl From<RepositoryError> for QpfmError {
    fn from(source: RepositoryError) -> Self {
        Self::CandidatesUnavailable { source }
    }
}

/// Failures reported by a [`MemoryRepository`](crate::store::MemoryRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An item with the same id already exists.
    #[error("memory '{id}' already exists in the repository")]
    Duplicate {
        /// Conflicting identifier.
        id: String,
    },

    /// The backing store could not be reached.
    #[error("repository backend unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description.
        reason: String,
    },
}
