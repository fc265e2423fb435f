//! Spatial cluster membership.
//!
//! Membership is kept in two indexes: cluster to members and member to
//! cluster. Every mutation goes through methods that update both, and
//! [`SpatialClusters::verify_consistency`] checks that they still agree.

use crate::types::MemoryId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Minimum similarity for joining an existing cluster (strictly greater).
pub const CLUSTER_JOIN_THRESHOLD: f64 = 0.7;

pub type ClusterId = Uuid;

/// Best cluster found for an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMatch {
    /// Matching cluster
    pub cluster: ClusterId,
    /// Similarity to the closest member of the cluster
    pub similarity: f64,
}

#[derive(Debug, Default, Clone)]
pub struct SpatialClusters {
    members: BTreeMap<ClusterId, BTreeSet<MemoryId>>,
    assignments: HashMap<MemoryId, ClusterId>,
}

impl SpatialClusters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cluster_of(&self, id: &str) -> Option<ClusterId> {
        self.assignments.get(id).copied()
    }

    #[must_use]
    pub fn members(&self, cluster: &ClusterId) -> Option<&BTreeSet<MemoryId>> {
        self.members.get(cluster)
    }

    /// Ids sharing a cluster with `id`, excluding `id` itself.
    #[must_use]
    pub fn cluster_mates(&self, id: &str) -> Vec<MemoryId> {
        self.cluster_of(id)
            .and_then(|cluster| self.members.get(&cluster))
            .map(|members| members.iter().filter(|m| m.as_str() != id).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClusterId, &BTreeSet<MemoryId>)> {
        self.members.iter()
    }

    /// Cluster whose most similar member beats [`CLUSTER_JOIN_THRESHOLD`].
    ///
    /// `similarity_to` returns the similarity between the item being placed
    /// and another stored item, or `None` if that item is gone. The item's own
    /// id is skipped.
    pub fn best_match(
        &self,
        id: &str,
        mut similarity_to: impl FnMut(&MemoryId) -> Option<f64>,
    ) -> Option<ClusterMatch> {
        let mut best: Option<ClusterMatch> = None;
        for (cluster, members) in &self.members {
            let closest = members
                .iter()
                .filter(|member| member.as_str() != id)
                .filter_map(&mut similarity_to)
                .fold(f64::NEG_INFINITY, f64::max);
            if closest <= CLUSTER_JOIN_THRESHOLD {
                continue;
            }
            let better = best.is_none_or(|current| {
                closest.partial_cmp(&current.similarity).unwrap_or(Ordering::Equal) == Ordering::Greater
            });
            if better {
                best = Some(ClusterMatch {
                    cluster: *cluster,
                    similarity: closest,
                });
            }
        }
        best
    }

    /// Put `id` into `cluster`, leaving any previous cluster.
    pub fn assign(&mut self, id: &str, cluster: ClusterId) {
        self.remove(id);
        self.members.entry(cluster).or_default().insert(id.to_string());
        self.assignments.insert(id.to_string(), cluster);
    }

    /// Start a new singleton cluster for `id`.
    pub fn create_singleton(&mut self, id: &str) -> ClusterId {
        let cluster = Uuid::new_v4();
        self.assign(id, cluster);
        cluster
    }

    /// Remove `id` from its cluster, dropping the cluster once empty.
    pub fn remove(&mut self, id: &str) -> Option<ClusterId> {
        let cluster = self.assignments.remove(id)?;
        if let Some(members) = self.members.get_mut(&cluster) {
            members.remove(id);
            if members.is_empty() {
                self.members.remove(&cluster);
            }
        }
        Some(cluster)
    }

    /// Check that both indexes describe the same membership.
    ///
    /// On disagreement the member index is rebuilt from the assignment index
    /// and an error is logged. Returns `true` if the indexes already agreed.
    pub fn verify_consistency(&mut self) -> bool {
        let forward_ok = self.members.iter().all(|(cluster, members)| {
            !members.is_empty()
                && members
                    .iter()
                    .all(|member| self.assignments.get(member) == Some(cluster))
        });
        let member_count: usize = self.members.values().map(BTreeSet::len).sum();
        let consistent = forward_ok && member_count == self.assignments.len();
        if !consistent {
            tracing::error!(
                clusters = self.members.len(),
                assignments = self.assignments.len(),
                indexed_members = member_count,
                "cluster indexes disagree, rebuilding from assignments"
            );
            debug_assert!(consistent, "cluster indexes disagree");
            self.rebuild_members();
        }
        consistent
    }

    fn rebuild_members(&mut self) {
        self.members.clear();
        for (id, cluster) in &self.assignments {
            self.members.entry(*cluster).or_default().insert(id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_and_reassignment_keep_indexes_in_step() {
        let mut clusters = SpatialClusters::new();
        let first = clusters.create_singleton("a");
        let second = clusters.create_singleton("b");
        assert_eq!(clusters.len(), 2);

        clusters.assign("b", first);
        assert_eq!(clusters.len(), 1, "emptied cluster is dropped");
        assert!(clusters.members(&second).is_none());
        assert_eq!(clusters.cluster_of("b"), Some(first));
        assert_eq!(clusters.cluster_mates("a"), vec!["b".to_string()]);
        assert!(clusters.verify_consistency());
    }

    #[test]
    fn test_join_threshold_is_strict() {
        let mut clusters = SpatialClusters::new();
        let cluster = clusters.create_singleton("anchor");
        assert!(clusters.best_match("new", |_| Some(0.7)).is_none());
        let found = clusters.best_match("new", |_| Some(0.71));
        assert_eq!(found.map(|m| m.cluster), Some(cluster));
    }

    #[test]
    fn test_best_match_ignores_self() {
        let mut clusters = SpatialClusters::new();
        clusters.create_singleton("solo");
        assert!(clusters.best_match("solo", |_| Some(1.0)).is_none());
    }

    #[test]
    fn test_best_match_prefers_most_similar_cluster() {
        let mut clusters = SpatialClusters::new();
        clusters.create_singleton("near");
        let far = clusters.create_singleton("nearer");
        let found = clusters.best_match("new", |id| Some(if id == "nearer" { 0.9 } else { 0.8 }));
        assert_eq!(found.map(|m| m.cluster), Some(far));
    }

    #[test]
    fn test_removing_last_member_drops_cluster() {
        let mut clusters = SpatialClusters::new();
        clusters.create_singleton("a");
        assert!(clusters.remove("a").is_some());
        assert!(clusters.is_empty());
        assert!(clusters.remove("a").is_none());
    }
}
