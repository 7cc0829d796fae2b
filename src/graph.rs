//! Hypergraphs and separator-induced component splitting.
//!
//! A [`Graph`] is an immutable pair of ordinary hyperedges and *special*
//! edges. Special edges are placeholders that carry the vertex set of an
//! already-decided sub-decomposition into a reduced subproblem; they count
//! toward the graph size and its vertex set but are never eligible as
//! separator members.

use crate::edges::{set_contains, sorted_union, Edge, Edges, Vertex};
use rustc_hash::FxHashMap;

// ============================================================================
// Graph
// ============================================================================

/// An immutable hypergraph: ordinary edges plus special placeholder edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    edges: Edges,
    specials: Edges,
}

impl Graph {
    /// Creates a graph with no special edges.
    pub fn new(edges: Edges) -> Self {
        Self {
            edges,
            specials: Edges::default(),
        }
    }

    /// Creates a graph with ordinary and special edges.
    pub fn with_specials(edges: Edges, specials: Edges) -> Self {
        Self { edges, specials }
    }

    /// The ordinary edges.
    #[inline]
    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    /// The special edges.
    #[inline]
    pub fn specials(&self) -> &Edges {
        &self.specials
    }

    /// Number of ordinary edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of special edges.
    #[inline]
    pub fn special_count(&self) -> usize {
        self.specials.len()
    }

    /// Total size: ordinary plus special edges. This is the quantity the
    /// balance limit is measured against.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len() + self.specials.len()
    }

    /// Returns whether the graph has neither edges nor specials.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.specials.is_empty()
    }

    /// The vertex set: union of ordinary and special edge vertices, sorted.
    pub fn vertices(&self) -> Vec<Vertex> {
        sorted_union(&self.edges.vertices(), &self.specials.vertices())
    }

    /// Order-independent fingerprint over the graph's edge and special
    /// vertex sets. Used as the component half of negative-cache keys.
    pub fn fingerprint(&self) -> u64 {
        self.edges
            .fingerprint()
            .rotate_left(17)
            .wrapping_add(self.specials.fingerprint())
    }

    /// Splits the graph along a separator.
    ///
    /// Removing `V(sep)` leaves each edge its *free* vertices. Edges with
    /// free vertices form the connected components, lifted back to
    /// sub-graphs of `H`: a component's edges keep their full vertex sets,
    /// so its `vertices()` may include separator vertices. Edges without
    /// free vertices are returned as the *isolated* edges; separator
    /// members that belong to `H` always end up there, since their
    /// vertices all lie inside `V(sep)`.
    ///
    /// Special edges are assigned to components the same way; a special
    /// with no free vertex forms a singleton component of its own.
    ///
    /// The component order is deterministic: components appear in the order
    /// of their first member edge (specials after ordinary edges).
    pub fn get_components(&self, sep: &Edges) -> (Vec<Graph>, Edges) {
        let sep_vertices = sep.vertices();
        let free = |e: &Edge| -> Vec<Vertex> {
            e.vertices()
                .iter()
                .copied()
                .filter(|&v| !set_contains(&sep_vertices, v))
                .collect()
        };

        let mut uf = UnionFind::default();
        for edge in self.edges.slice() {
            let fv = free(edge);
            for pair in fv.windows(2) {
                uf.union(pair[0], pair[1]);
            }
        }
        for sp in self.specials.slice() {
            let fv = free(sp);
            for pair in fv.windows(2) {
                uf.union(pair[0], pair[1]);
            }
        }

        let mut index_of_root: FxHashMap<Vertex, usize> = FxHashMap::default();
        let mut comp_edges: Vec<Vec<Edge>> = Vec::new();
        let mut comp_specials: Vec<Vec<Edge>> = Vec::new();
        let mut isolated: Vec<Edge> = Vec::new();

        for edge in self.edges.slice() {
            let fv = free(edge);
            match fv.first() {
                None => isolated.push(edge.clone()),
                Some(&v) => {
                    let root = uf.find(v);
                    let idx = *index_of_root.entry(root).or_insert_with(|| {
                        comp_edges.push(Vec::new());
                        comp_specials.push(Vec::new());
                        comp_edges.len() - 1
                    });
                    comp_edges[idx].push(edge.clone());
                }
            }
        }
        for sp in self.specials.slice() {
            let fv = free(sp);
            match fv.first() {
                None => {
                    // A fully covered special still has to be attached
                    // somewhere below; it becomes its own component.
                    comp_edges.push(Vec::new());
                    comp_specials.push(vec![sp.clone()]);
                }
                Some(&v) => {
                    let root = uf.find(v);
                    let idx = *index_of_root.entry(root).or_insert_with(|| {
                        comp_edges.push(Vec::new());
                        comp_specials.push(Vec::new());
                        comp_edges.len() - 1
                    });
                    comp_specials[idx].push(sp.clone());
                }
            }
        }

        let components = comp_edges
            .into_iter()
            .zip(comp_specials)
            .map(|(edges, specials)| Graph::with_specials(Edges::new(edges), Edges::new(specials)))
            .collect();
        (components, Edges::new(isolated))
    }
}

/// Edges of `edges` that have at least one vertex in the sorted set
/// `vertices`.
pub fn filter_vertices(edges: &Edges, vertices: &[Vertex]) -> Edges {
    Edges::new(
        edges
            .slice()
            .iter()
            .filter(|e| e.vertices().iter().any(|&v| set_contains(vertices, v)))
            .cloned()
            .collect(),
    )
}

// ============================================================================
// Union-find
// ============================================================================

/// Union-find over vertex ids, keyed sparsely since component splitting
/// only ever touches the vertices outside the separator.
#[derive(Default)]
struct UnionFind {
    parent: FxHashMap<Vertex, Vertex>,
}

impl UnionFind {
    fn find(&mut self, v: Vertex) -> Vertex {
        let mut root = v;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        // Path compression.
        let mut cur = v;
        while let Some(&p) = self.parent.get(&cur) {
            if p == root {
                break;
            }
            self.parent.insert(cur, root);
            cur = p;
        }
        root
    }

    fn union(&mut self, a: Vertex, b: Vertex) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(rb, ra);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
