//! Memory repository collaborator.
//!
//! The engine never owns memory items. It reads candidates through
//! [`MemoryRepository`] and writes learning updates through the per-item
//! [`MemoryHandle`] lock, which serializes concurrent updates to one item.

use crate::error::RepositoryError;
use crate::types::{HarmonicCategory, MemoryId, MemoryItem};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Shared, lock-guarded reference to a stored item.
pub type MemoryHandle = Arc<RwLock<MemoryItem>>;

/// Filter applied when fetching query candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRequest {
    /// Only return items of this category
    pub category: Option<HarmonicCategory>,
    /// Upper bound on returned candidates
    pub limit: Option<usize>,
}

impl CandidateRequest {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            category: None,
            limit: None,
        }
    }

    #[must_use]
    pub const fn in_category(category: HarmonicCategory) -> Self {
        Self {
            category: Some(category),
            limit: None,
        }
    }
}

/// Storage for memory items, owned outside the engine.
///
/// `candidates` may block (e.g. on I/O); everything the engine does after it
/// returns is CPU-bound.
pub trait MemoryRepository: Send + Sync + Debug {
    /// Insert a new item, rejecting duplicate ids.
    fn insert(&self, item: MemoryItem) -> Result<MemoryHandle, RepositoryError>;

    fn get(&self, id: &str) -> Option<MemoryHandle>;

    /// Items eligible for a query, in a stable order.
    fn candidates(&self, request: &CandidateRequest) -> Result<Vec<MemoryHandle>, RepositoryError>;

    /// Every stored item.
    fn all(&self) -> Result<Vec<MemoryHandle>, RepositoryError> {
        self.candidates(&CandidateRequest::all())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only copies of the requested items, taken one lock at a time.
    fn snapshot(&self, request: &CandidateRequest) -> Result<Vec<Arc<MemoryItem>>, RepositoryError> {
        Ok(self
            .candidates(request)?
            .iter()
            .map(|handle| Arc::new(handle.read().clone()))
            .collect())
    }
}

/// DashMap-backed repository used by default and in tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    items: DashMap<MemoryId, MemoryHandle>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryRepository for InMemoryRepository {
    fn insert(&self, item: MemoryItem) -> Result<MemoryHandle, RepositoryError> {
        match self.items.entry(item.id.clone()) {
            Entry::Occupied(entry) => Err(RepositoryError::Duplicate {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let handle = Arc::new(RwLock::new(item));
                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    fn get(&self, id: &str) -> Option<MemoryHandle> {
        self.items.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn candidates(&self, request: &CandidateRequest) -> Result<Vec<MemoryHandle>, RepositoryError> {
        let mut matching: Vec<(MemoryId, MemoryHandle)> = self
            .items
            .iter()
            .filter(|entry| {
                request
                    .category
                    .is_none_or(|category| entry.value().read().category() == category)
            })
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));
        let limit = request.limit.unwrap_or(usize::MAX);
        Ok(matching.into_iter().take(limit).map(|(_, handle)| handle).collect())
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
