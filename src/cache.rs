//! Negative memoization of failed (separator, component) subproblems.
//!
//! When a recursive decomposition of a component under a chosen child
//! separator fails, the pair is recorded; any later attempt to pair the
//! same separator (by vertex fingerprint) with the same component is
//! skipped without recursing. The cache is add-only and shared across all
//! tasks of one top-level `find_decomp` call. A racing insert may be
//! observed late by a sibling; that only costs a redundant recursion,
//! never a wrong answer.

use crate::edges::{vertex_set_fingerprint, Edges};
use crate::graph::Graph;
use dashmap::DashSet;
use rustc_hash::FxBuildHasher;

// ============================================================================
// NegativeCache
// ============================================================================

/// Concurrent add-only set of failed (separator, component) fingerprints.
#[derive(Debug, Default)]
pub struct NegativeCache {
    seen: DashSet<(u64, u64), FxBuildHasher>,
}

impl NegativeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `comp` has no decomposition under the separator `sep`.
    pub fn add_negative(&self, sep: &Edges, comp: &Graph) {
        self.seen.insert((Self::sep_key(sep), comp.fingerprint()));
    }

    /// Returns whether any of `comps` is already known to fail under
    /// `sep`.
    pub fn check_negative(&self, sep: &Edges, comps: &[Graph]) -> bool {
        let sep_key = Self::sep_key(sep);
        comps
            .iter()
            .any(|c| self.seen.contains(&(sep_key, c.fingerprint())))
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn sep_key(sep: &Edges) -> u64 {
        vertex_set_fingerprint(&sep.vertices())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::{Edge, Vertex};
    use rayon::prelude::*;

    fn edge(name: u32, vertices: &[Vertex]) -> Edge {
        Edge::new(name, vertices.to_vec())
    }

    fn comp(name: u32, vertices: &[Vertex]) -> Graph {
        Graph::new(Edges::new(vec![edge(name, vertices)]))
    }

    #[test]
    fn recorded_pair_is_found() {
        let cache = NegativeCache::new();
        let sep = Edges::new(vec![edge(1, &[1, 2])]);
        let c = comp(2, &[2, 3]);
        assert!(!cache.check_negative(&sep, std::slice::from_ref(&c)));
        cache.add_negative(&sep, &c);
        assert!(cache.check_negative(&sep, std::slice::from_ref(&c)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unrelated_component_is_not_found() {
        let cache = NegativeCache::new();
        let sep = Edges::new(vec![edge(1, &[1, 2])]);
        cache.add_negative(&sep, &comp(2, &[2, 3]));
        assert!(!cache.check_negative(&sep, &[comp(3, &[4, 5])]));
    }

    #[test]
    fn separator_key_ignores_edge_order() {
        let cache = NegativeCache::new();
        let sep_a = Edges::new(vec![edge(1, &[1, 2]), edge(2, &[2, 3])]);
        let sep_b = Edges::new(vec![edge(2, &[2, 3]), edge(1, &[1, 2])]);
        let c = comp(3, &[3, 4]);
        cache.add_negative(&sep_a, &c);
        assert!(cache.check_negative(&sep_b, std::slice::from_ref(&c)));
    }

    #[test]
    fn check_scans_all_components() {
        let cache = NegativeCache::new();
        let sep = Edges::new(vec![edge(1, &[1, 2])]);
        let bad = comp(4, &[7, 8]);
        cache.add_negative(&sep, &bad);
        let comps = vec![comp(2, &[2, 3]), comp(3, &[5, 6]), bad];
        assert!(cache.check_negative(&sep, &comps));
    }

    #[test]
    fn concurrent_inserts_are_all_visible() {
        let cache = NegativeCache::new();
        let sep = Edges::new(vec![edge(1, &[1, 2])]);
        (0u32..64).into_par_iter().for_each(|i| {
            cache.add_negative(&sep, &comp(100 + i, &[100 + i]));
        });
        assert_eq!(cache.len(), 64);
        for i in 0u32..64 {
            assert!(cache.check_negative(&sep, &[comp(100 + i, &[100 + i])]));
        }
    }
}
