//! Quantum probability field memory.
//!
//! Memories live at coordinates inside the unit cube. A query does not look
//! items up by key; it projects a probability field over the cube, scores
//! every candidate into a normalized superposition, looks for interference
//! between the candidates, and collapses to the dominant states. Every query
//! then feeds back into the field: returned items gain resonance and
//! confidence, co-retrieved items become associated and drift together, and
//! an emergent-behavior pass looks for connections nobody asked for.
//!
//! ```no_run
//! use qpfm_core::{
//!     Coordinates, EngineConfig, HarmonicCategory, HarmonicSignature, MemoryContent,
//!     MemoryItem, MemoryQuery, QuantumMemoryEngine,
//! };
//!
//! # fn main() -> qpfm_core::Result<()> {
//! let engine = QuantumMemoryEngine::new(EngineConfig::default())?;
//! let signature = HarmonicSignature::new(HarmonicCategory::Wave, 0.8, 0.4);
//! engine.store(MemoryItem::new(
//!     "fourier",
//!     Coordinates::new(0.4, 0.8, 0.3),
//!     MemoryContent::new("Fourier transform", signature),
//! ))?;
//!
//! let result = engine.query(&MemoryQuery::discovery().with_context(["fourier"]))?;
//! assert_eq!(result.ids(), vec!["fourier"]);
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo
)]
#![deny(clippy::unwrap_in_result, clippy::panic_in_result_fn)]

pub mod config;
pub mod cycle;
pub mod deferred;
pub mod emergence;
pub mod engine;
pub mod error;
pub mod field;
pub mod learning;
pub mod mapper;
pub mod metrics;
mod numeric;
pub mod similarity;
pub mod store;
pub mod superposition;
pub mod types;

pub use config::{EngineConfig, InsightDelivery};
pub use cycle::{QueryCycle, QueryPhase};
pub use emergence::{EmergenceContext, EmergenceReport, EmergentBehaviorEngine, EmergentMode};
pub use engine::{
    EngineBuilder, EngineStats, ExecutionMetrics, MemoryScore, QuantumMemoryEngine, QueryResult,
    SimilarMemory, SimilarityOptions,
};
pub use error::{QpfmError, RepositoryError, Result};
pub use field::{FieldShapeFunction, HarmonicPhase, PhaseFunction, ProbabilityField, StandardFalloff};
pub use learning::{InteractionRecord, LearningSystem, MaintenanceReport};
pub use mapper::{CoordinateMapper, HarmonicCoordinateMapper};
pub use metrics::PerformanceMetrics;
pub use similarity::memory_similarity;
pub use store::{CandidateRequest, InMemoryRepository, MemoryHandle, MemoryRepository};
pub use superposition::{InterferencePattern, MemoryState, Superposition, SuperpositionEngine};
pub use types::{
    AccessEvent, Coordinates, EmergentInsight, HarmonicCategory, HarmonicSignature, InsightType,
    MemoryContent, MemoryId, MemoryItem, MemoryQuery, QueryType,
};
