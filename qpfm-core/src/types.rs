//! Shared data model for the probability field memory engine.
//!
//! Memory items live at fixed coordinates inside the unit cube and carry an
//! immutable harmonic signature describing their semantic "shape". Everything
//! that scores, groups, or adapts items operates on the types defined here.

use crate::error::{QpfmError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Identifier of a memory item inside the repository.
pub type MemoryId = String;

/// Maximum number of access events retained per memory item.
pub const ACCESS_HISTORY_CAPACITY: usize = 100;

/// Diagonal of the unit cube, the largest possible distance between two items.
pub const MAX_DISTANCE: f64 = 1.732_050_807_568_877_2;

/// Position of a memory item inside `[0,1]^3`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    /// Centre of the coordinate space.
    pub const CENTER: Self = Self::new(0.5, 0.5, 0.5);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True when every component is finite and inside `[0,1]`.
    #[must_use]
    pub fn is_within_unit_cube(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    /// Component-wise clamp into the unit cube.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
            z: self.z.clamp(0.0, 1.0),
        }
    }

    /// Move a `rate` fraction of the way toward `target`, staying inside the cube.
    #[must_use]
    pub fn moved_toward(self, target: &Self, rate: f64) -> Self {
        Self {
            x: self.x + (target.x - self.x) * rate,
            y: self.y + (target.y - self.y) * rate,
            z: self.z + (target.z - self.z) * rate,
        }
        .clamped()
    }

    /// Arithmetic mean of a set of points, `None` when the set is empty.
    pub fn centroid<'a>(points: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        let mut count = 0_usize;
        let mut sum = Self::default();
        for point in points {
            sum.x += point.x;
            sum.y += point.y;
            sum.z += point.z;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = crate::numeric::usize_to_f64(count);
        Some(Self::new(sum.x / n, sum.y / n, sum.z / n))
    }

    /// Volume of the axis-aligned bounding box around a set of points.
    pub fn bounding_volume<'a>(points: impl IntoIterator<Item = &'a Self>) -> f64 {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut any = false;
        for point in points {
            any = true;
            for (axis, value) in [point.x, point.y, point.z].into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
        if !any {
            return 0.0;
        }
        (0..3).map(|axis| max[axis] - min[axis]).product()
    }
}

/// Semantic family of a harmonic signature.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicCategory {
    Classical,
    Geometric,
    Fractal,
    Wave,
    InformationTheory,
    Topological,
    Structural,
    Behavioral,
}

impl HarmonicCategory {
    /// All categories in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Classical,
        Self::Geometric,
        Self::Fractal,
        Self::Wave,
        Self::InformationTheory,
        Self::Topological,
        Self::Structural,
        Self::Behavioral,
    ];

    /// Stable ordinal used by phase hashing and coordinate mapping.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Classical => 0,
            Self::Geometric => 1,
            Self::Fractal => 2,
            Self::Wave => 3,
            Self::InformationTheory => 4,
            Self::Topological => 5,
            Self::Structural => 6,
            Self::Behavioral => 7,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classical => "classical",
            Self::Geometric => "geometric",
            Self::Fractal => "fractal",
            Self::Wave => "wave",
            Self::InformationTheory => "information_theory",
            Self::Topological => "topological",
            Self::Structural => "structural",
            Self::Behavioral => "behavioral",
        }
    }
}

impl fmt::Display for HarmonicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable "pattern DNA" computed by the upstream analysis process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicSignature {
    /// Semantic family, fixes the phase sector
    pub category: HarmonicCategory,
    /// Pattern strength in `[0,1]`
    pub strength: f64,
    /// Pattern complexity in `[0,1]`
    pub complexity: f64,
    /// Analyzer confidence in `[0,1]`
    pub confidence: f64,
    /// Number of times the pattern was observed upstream
    pub occurrences: u32,
}

impl HarmonicSignature {
    #[must_use]
    pub const fn new(category: HarmonicCategory, strength: f64, complexity: f64) -> Self {
        Self {
            category,
            strength,
            complexity,
            confidence: 0.5,
            occurrences: 1,
        }
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub const fn with_occurrences(mut self, occurrences: u32) -> Self {
        self.occurrences = occurrences;
        self
    }

    /// Reject signatures whose numeric fields are missing (non-finite) or out of range.
    pub fn validate(&self, id: &str) -> Result<()> {
        for (name, value) in [
            ("strength", self.strength),
            ("complexity", self.complexity),
            ("confidence", self.confidence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(QpfmError::validation(
                    id,
                    format!("harmonic signature {name} must be a finite value in [0,1], got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Descriptive content of a memory item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContent {
    /// Short human-readable name
    pub title: String,
    /// Longer free text, may be empty
    pub description: String,
    /// Free-form content kind supplied by the producer (e.g. "function", "document")
    pub kind: String,
    /// Signature supplied at ingest; never modified
    pub harmonic_signature: HarmonicSignature,
    /// Labels compared by tag overlap
    pub tags: BTreeSet<String>,
    /// Opaque payload carried through untouched
    pub payload: Payload,
}

/// Opaque bytes attached to a memory item; the engine never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(pub Vec<u8>);

impl MemoryContent {
    #[must_use]
    pub fn new(title: impl Into<String>, signature: HarmonicSignature) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind: String::from("memory"),
            harmonic_signature: signature,
            tags: BTreeSet::new(),
            payload: Payload::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Payload(payload);
        self
    }
}

/// A single recorded access of a memory item by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// When the access happened
    pub timestamp: DateTime<Utc>,
    /// Mode of the query that touched the item
    pub query_type: QueryType,
    /// Whether the item ranked in the relevant half of the results
    pub success: bool,
    /// Activation of the item when the access was recorded
    pub activation: f64,
}

/// A memory item stored at a fixed coordinate with activation dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique, non-empty identifier
    pub id: MemoryId,
    /// Position in the unit cube; moves only through spatial adaptation
    pub coordinates: Coordinates,
    /// Producer-supplied content
    pub content: MemoryContent,
    /// Activation the item decays back to
    pub resting_potential: f64,
    /// Activation at which the item fires
    pub threshold: f64,
    /// Activation after the last access, capped at `threshold`
    pub current_activation: f64,
    /// Most recent accesses, oldest first, at most [`ACCESS_HISTORY_CAPACITY`]
    pub access_history: VecDeque<AccessEvent>,
    /// Confidence in `[0.1, 1.0]`
    pub confidence_score: f64,
    /// Accumulated importance in `[0, 1]`
    pub resonance_strength: f64,
    /// Last time learning changed the item
    pub last_evolution: DateTime<Utc>,
}

impl MemoryItem {
    /// Creates an item with neutral activation dynamics.
    #[must_use]
    pub fn new(id: impl Into<MemoryId>, coordinates: Coordinates, content: MemoryContent) -> Self {
        Self {
            id: id.into(),
            coordinates,
            content,
            resting_potential: 0.1,
            threshold: 0.7,
            current_activation: 0.1,
            access_history: VecDeque::new(),
            confidence_score: 0.5,
            resonance_strength: 0.5,
            last_evolution: Utc::now(),
        }
    }

    /// Shorthand for the item's harmonic signature.
    #[must_use]
    pub const fn signature(&self) -> &HarmonicSignature {
        &self.content.harmonic_signature
    }

    #[must_use]
    pub const fn category(&self) -> HarmonicCategory {
        self.content.harmonic_signature.category
    }

    /// Ingest-boundary validation: identity, coordinates, and signature.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QpfmError::validation(&self.id, "memory id must not be empty"));
        }
        if !self.coordinates.is_within_unit_cube() {
            return Err(QpfmError::validation(
                &self.id,
                format!(
                    "coordinates ({}, {}, {}) fall outside [0,1]^3",
                    self.coordinates.x, self.coordinates.y, self.coordinates.z
                ),
            ));
        }
        self.signature().validate(&self.id)
    }

    /// Append an access event, evicting the oldest beyond the history capacity.
    pub fn record_access(&mut self, event: AccessEvent) {
        self.access_history.push_back(event);
        while self.access_history.len() > ACCESS_HISTORY_CAPACITY {
            self.access_history.pop_front();
        }
    }

    /// Accesses per hour derived from the mean interval between recorded accesses.
    ///
    /// Returns `None` with fewer than two accesses. The interval is floored at
    /// one millisecond so bursts never divide by zero.
    #[must_use]
    pub fn activation_frequency(&self) -> Option<f64> {
        if self.access_history.len() < 2 {
            return None;
        }
        let intervals: Vec<i64> = self
            .access_history
            .iter()
            .zip(self.access_history.iter().skip(1))
            .map(|(earlier, later)| (later.timestamp - earlier.timestamp).num_milliseconds())
            .collect();
        let total: i64 = intervals.iter().sum();
        let mean_ms = crate::numeric::floored(
            crate::numeric::i64_to_f64(total) / crate::numeric::usize_to_f64(intervals.len()),
            1.0,
        );
        Some(3_600_000.0 / mean_ms)
    }
}

/// Retrieval mode requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Precision,
    Discovery,
    Creative,
}

impl QueryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Precision => "precision",
            Self::Discovery => "discovery",
            Self::Creative => "creative",
        }
    }
}

/// Identifier reported in validation errors raised for a query.
pub const QUERY_INPUT: &str = "<query>";

/// Client query resolved by the engine into a probability field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Retrieval mode, selects the base radius
    pub query_type: QueryType,
    /// Pattern to centre the field on; `None` falls back to the context window
    pub harmonic_signature: Option<HarmonicSignature>,
    /// Required confidence in `[0,1]`; higher values narrow the field
    pub confidence: f64,
    /// Exploration appetite in `[0,1]`
    pub exploration: f64,
    /// Urgency in `[0,1]`; higher urgency shortens the query deadline
    pub urgency: Option<f64>,
    /// Result cap; `None` uses the configured default
    pub max_results: Option<usize>,
    /// Ids of recently relevant items used to centre signature-less queries
    pub context_window: Vec<MemoryId>,
}

impl MemoryQuery {
    #[must_use]
    pub const fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            harmonic_signature: None,
            confidence: 0.5,
            exploration: 0.3,
            urgency: None,
            max_results: None,
            context_window: Vec::new(),
        }
    }

    #[must_use]
    pub const fn precision() -> Self {
        Self::new(QueryType::Precision)
    }

    #[must_use]
    pub const fn discovery() -> Self {
        Self::new(QueryType::Discovery)
    }

    #[must_use]
    pub const fn creative() -> Self {
        Self::new(QueryType::Creative)
    }

    #[must_use]
    pub fn with_signature(mut self, signature: HarmonicSignature) -> Self {
        self.harmonic_signature = Some(signature);
        self
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub const fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    #[must_use]
    pub const fn with_urgency(mut self, urgency: f64) -> Self {
        self.urgency = Some(urgency);
        self
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn with_context<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MemoryId>,
    {
        self.context_window = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Reject queries whose confidence, exploration or urgency is non-finite or outside `[0,1]`.
    pub fn validate(&self) -> Result<()> {
        let mut checks = vec![("confidence", self.confidence), ("exploration", self.exploration)];
        if let Some(urgency) = self.urgency {
            checks.push(("urgency", urgency));
        }
        for (name, value) in checks {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(QpfmError::validation(
                    QUERY_INPUT,
                    format!("query {name} must be a finite value in [0,1], got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Kind of an unsolicited insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    NovelConnection,
    PatternSynthesis,
    UnexpectedRelevance,
}

/// An unsolicited relevance claim produced by the emergent behavior engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentInsight {
    /// Random id assigned at creation
    pub id: uuid::Uuid,
    /// Which detector produced the insight
    pub insight_type: InsightType,
    /// Human-readable explanation
    pub description: String,
    /// Memories the claim is about
    pub contributing_memories: Vec<MemoryId>,
    /// Novelty in `[0,1]`
    pub novelty_score: f64,
    /// Detector confidence in `[0,1]`
    pub confidence_level: f64,
    /// Follow-up the caller may take, if any
    pub suggested_action: Option<String>,
}

impl EmergentInsight {
    #[must_use]
    pub fn new(
        insight_type: InsightType,
        description: impl Into<String>,
        contributing_memories: Vec<MemoryId>,
        novelty_score: f64,
        confidence_level: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            insight_type,
            description: description.into(),
            contributing_memories,
            novelty_score: novelty_score.clamp(0.0, 1.0),
            confidence_level: confidence_level.clamp(0.0, 1.0),
            suggested_action: None,
        }
    }

    #[must_use]
    pub fn with_suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }
}
