//! Parallel predicate-driven search over candidate separators.
//!
//! [`SeparatorSearch::find_next`] fans the k-subset enumeration out over
//! sharded [`CombinationIterator`]s, one rayon worker per shard, all
//! racing to deliver the next candidate that satisfies the predicate. The
//! first winner flips a shared flag; losing workers observe it at their
//! next iteration and exit without delivering. A worker whose candidate
//! passed the predicate but lost the race keeps it pending with the
//! shard's verified bit set, so repeated `find_next` calls enumerate
//! every satisfying candidate exactly once and never re-run the predicate
//! on a candidate it already passed.

use crate::combin::{split_combinations, CombinationIterator};
use crate::edges::{intersect, is_subset, vertex_set_fingerprint, Edges, Vertex};
use crate::graph::Graph;
use crossbeam::queue::ArrayQueue;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Predicates
// ============================================================================

/// A check applied to each candidate separator during the search.
/// Implementations are shared by reference across worker threads.
pub trait Predicate: Sync {
    /// Returns whether `sep` is acceptable for `graph` under the given
    /// balance factor.
    fn check(&self, graph: &Graph, sep: &Edges, bal_factor: usize) -> bool;
}

/// Accepts separators all of whose components stay under the balance
/// limit.
///
/// A separator whose combined vertex set equals some special edge's
/// vertex set is rejected outright: special edges stand for decided
/// subproblems and must never be re-derived as separators.
pub struct BalancedCheck;

impl Predicate for BalancedCheck {
    fn check(&self, graph: &Graph, sep: &Edges, bal_factor: usize) -> bool {
        let (comps, _) = graph.get_components(sep);
        let limit = balance_limit(graph.len(), bal_factor);
        if comps.iter().any(|c| c.len() > limit) {
            return false;
        }
        let sep_fp = vertex_set_fingerprint(&sep.vertices());
        !graph
            .specials()
            .slice()
            .iter()
            .any(|sp| sp.fingerprint() == sep_fp)
    }
}

/// Accepts separators that are legal parents for a fixed child separator.
///
/// A legal parent leaves exactly one over-sized ("low") component `L`,
/// covers the incoming connector vertices inside `L`, and shares vertices
/// with `L` only through the child's connector.
pub struct ParentCheck {
    /// Connector vertices of the current subproblem (sorted set).
    pub conn: Vec<Vertex>,
    /// Vertex set of the child separator (sorted set).
    pub child: Vec<Vertex>,
}

impl Predicate for ParentCheck {
    fn check(&self, graph: &Graph, sep: &Edges, bal_factor: usize) -> bool {
        let (comps, _) = graph.get_components(sep);
        let limit = balance_limit(graph.len(), bal_factor);
        let Some(comp_low) = comps.iter().find(|c| c.len() > limit) else {
            return false;
        };

        let vert_low = comp_low.vertices();
        let sep_vertices = sep.vertices();
        if !is_subset(&intersect(&vert_low, &self.conn), &sep_vertices) {
            return false;
        }
        let child_chi = intersect(&self.child, &vert_low);
        is_subset(&intersect(&vert_low, &sep_vertices), &child_chi)
    }
}

/// The component-size bound for a graph of `len` edges+specials:
/// `len * (b - 1) / b` in integer arithmetic.
#[inline]
pub fn balance_limit(len: usize, bal_factor: usize) -> usize {
    len * (bal_factor - 1) / bal_factor
}

// ============================================================================
// SeparatorSearch
// ============================================================================

/// A resumable parallel search for separators satisfying a predicate.
pub struct SeparatorSearch<'a> {
    graph: &'a Graph,
    edges: &'a Edges,
    bal_factor: usize,
    generators: Vec<CombinationIterator>,
    /// Indices (into `edges`) of the most recently found separator.
    pub result: Vec<usize>,
    /// Set once the whole candidate space has been enumerated.
    pub exhausted: bool,
}

impl<'a> SeparatorSearch<'a> {
    /// Creates a search over the k-subsets of `edges`, sharded across the
    /// available cores.
    pub fn new(graph: &'a Graph, edges: &'a Edges, k: usize, bal_factor: usize) -> Self {
        let shards = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(1);
        Self::with_shards(graph, edges, k, bal_factor, shards)
    }

    /// Creates a search with an explicit shard count. A single shard makes
    /// the candidate order fully deterministic.
    pub fn with_shards(
        graph: &'a Graph,
        edges: &'a Edges,
        k: usize,
        bal_factor: usize,
        shards: usize,
    ) -> Self {
        Self {
            graph,
            edges,
            bal_factor,
            generators: split_combinations(edges.len(), k, shards),
            result: Vec::new(),
            exhausted: false,
        }
    }

    /// Finds the next separator satisfying `pred`, writing its edge
    /// indices to `result`, or sets `exhausted` when none remains.
    ///
    /// Which of several simultaneously satisfying shards delivers is
    /// unspecified, but iterating until `exhausted` yields every
    /// satisfying k-subset exactly once.
    pub fn find_next<P: Predicate>(&mut self, pred: &P) {
        self.result.clear();
        if self.exhausted {
            return;
        }

        let found: ArrayQueue<Vec<usize>> = ArrayQueue::new(1);
        let finished = AtomicBool::new(false);
        let graph = self.graph;
        let edges = self.edges;
        let bal_factor = self.bal_factor;

        self.generators.par_iter_mut().for_each(|gen| {
            while gen.has_next() {
                if finished.load(Ordering::Acquire) {
                    return;
                }
                let candidate = gen.combination().to_vec();
                if gen.is_verified() || pred.check(graph, &edges.subset(&candidate), bal_factor) {
                    gen.mark_verified();
                    if finished
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        let _ = found.push(candidate);
                        gen.confirm();
                    }
                    // The loser keeps its verified candidate pending for
                    // the next round.
                    return;
                }
                gen.confirm();
            }
        });

        match found.pop() {
            Some(indices) => self.result = indices,
            None => self.exhausted = true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
