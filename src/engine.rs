//! The balanced-separator log-depth decomposition engine.
//!
//! [`LogKEngine::find_decomp`] runs a recursive divide-and-conquer
//! search: at every level it picks a balanced *child* separator and,
//! unless the child can serve as the subtree root outright, a matching
//! *parent* separator, then recurses on the balanced components and the
//! reduced upper graph in parallel and stitches the results back into one
//! tree. The balance invariant bounds the recursion depth by
//! `log_{b/(b-1)}` of the graph size.
//!
//! Failure ("no decomposition of width k") is `None`; panics are reserved
//! for engine invariants whose violation indicates a bug.

use crate::cache::NegativeCache;
use crate::edges::{intersect, is_subset, sorted_union, Edge, Edges, Vertex};
use crate::graph::{filter_vertices, Graph};
use crate::search::{balance_limit, BalancedCheck, ParentCheck, SeparatorSearch};
use crate::tree::{attach, satisfies_running_intersection, Node};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// Decomp
// ============================================================================

/// A generalized hypertree decomposition of a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decomp {
    /// The (sub)graph this decomposition covers.
    pub graph: Graph,
    /// The root of the labelled tree.
    pub root: Node,
}

impl Decomp {
    /// Verifies the decomposition against `graph`: every vertex occurs in
    /// some bag, every hyperedge fits inside a single bag, every vertex's
    /// bags induce a connected subtree, and every bag is contained in its
    /// cover's vertex set.
    ///
    /// The width bound is checked separately via [`Decomp::width`].
    pub fn check_correct(&self, graph: &Graph) -> bool {
        if !is_subset(&graph.vertices(), &self.root.vertices()) {
            return false;
        }
        if !graph.edges().slice().iter().all(|e| self.root.covers_edge(e)) {
            return false;
        }
        if !satisfies_running_intersection(&self.root) {
            return false;
        }
        self.root.bags_inside_covers()
    }

    /// The width of the decomposition: the largest cover size over all
    /// nodes.
    pub fn width(&self) -> usize {
        self.root.max_cover_size()
    }
}

// ============================================================================
// LogKEngine
// ============================================================================

/// Engine searching for a decomposition of width at most `k`.
pub struct LogKEngine {
    graph: Graph,
    k: usize,
    bal_factor: usize,
    use_cache: bool,
}

/// State shared across all tasks of one `find_decomp` call.
struct SearchContext {
    cache: NegativeCache,
    /// Source of fresh special-edge marker names, seeded above every name
    /// in the input graph.
    next_marker: AtomicU32,
}

impl SearchContext {
    fn fresh_marker(&self, vertices: Vec<Vertex>) -> Edge {
        Edge::new(self.next_marker.fetch_add(1, Ordering::Relaxed), vertices)
    }
}

impl LogKEngine {
    /// Creates an engine with the default balance factor of 2.
    ///
    /// # Panics
    /// Panics if `k` is zero.
    pub fn new(graph: Graph, k: usize) -> Self {
        assert!(k >= 1, "width bound k must be positive");
        Self {
            graph,
            k,
            bal_factor: 2,
            use_cache: true,
        }
    }

    /// Overrides the balance factor `b`: components of a balanced
    /// separator may keep at most `(len * (b - 1)) / b` edges+specials.
    ///
    /// # Panics
    /// Panics if `b < 2`.
    pub fn with_balance_factor(mut self, bal_factor: usize) -> Self {
        assert!(bal_factor >= 2, "balance factor must be at least 2");
        self.bal_factor = bal_factor;
        self
    }

    /// Disables the negative cache. The result is unaffected (the cache
    /// only prunes repeated failing subproblems); useful for diagnostics
    /// and tests.
    pub fn without_negative_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// The input graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The width bound.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Searches for a decomposition of width at most `k`. Returns `None`
    /// when none exists.
    pub fn find_decomp(&self) -> Option<Decomp> {
        let max_name = self
            .graph
            .edges()
            .slice()
            .iter()
            .map(Edge::name)
            .max()
            .unwrap_or(0);
        let ctx = SearchContext {
            cache: NegativeCache::new(),
            next_marker: AtomicU32::new(max_name + 1),
        };
        self.find_decomp_rec(&self.graph, &[], self.graph.edges(), &ctx)
    }

    // ------------------------------------------------------------------------
    // Base cases
    // ------------------------------------------------------------------------

    fn is_base_case(&self, h: &Graph, allowed_len: usize) -> bool {
        (h.edge_count() <= self.k && h.special_count() == 0)
            || (h.edge_count() == 0 && h.special_count() >= 1)
            || allowed_len == 0
    }

    fn base_case(&self, h: &Graph) -> Option<Decomp> {
        if h.edge_count() <= self.k && h.special_count() == 0 {
            return Some(Decomp {
                graph: h.clone(),
                root: Node::new(h.vertices(), h.edges().clone()),
            });
        }
        if h.edge_count() == 0 && h.special_count() == 1 {
            let cover = Edges::new(vec![h.specials().slice()[0].clone()]);
            return Some(Decomp {
                graph: h.clone(),
                root: Node::new(cover.vertices(), cover),
            });
        }
        // More than one special with no edges left to separate them, or
        // no allowed edges for a non-trivial graph.
        None
    }

    // ------------------------------------------------------------------------
    // Recursion
    // ------------------------------------------------------------------------

    fn find_decomp_rec(
        &self,
        h: &Graph,
        conn: &[Vertex],
        allowed_full: &Edges,
        ctx: &SearchContext,
    ) -> Option<Decomp> {
        let vertices_h = h.vertices();
        assert!(
            is_subset(conn, &vertices_h),
            "connector {conn:?} is not contained in the subgraph {h:?}"
        );

        if self.is_base_case(h, allowed_full.len()) {
            return self.base_case(h);
        }

        let allowed = filter_vertices(allowed_full, &vertices_h);
        let mut child_search = SeparatorSearch::new(h, &allowed, self.k, self.bal_factor);

        // Together with the inner PARENT loop this covers every
        // parent-child pairing of balanced separators.
        'child: loop {
            child_search.find_next(&BalancedCheck);
            if child_search.exhausted {
                break;
            }
            let child_sep = allowed.subset(&child_search.result);
            let child_vertices = child_sep.vertices();
            let (comps_c, _) = h.get_components(&child_sep);

            // Root case: the child separator alone covers the connector.
            if is_subset(conn, &child_vertices) {
                let child_chi = intersect(&child_vertices, &vertices_h);
                if self.use_cache && ctx.cache.check_negative(&child_sep, &comps_c) {
                    continue 'child;
                }

                let results: Vec<Option<Decomp>> = comps_c
                    .par_iter()
                    .map(|comp| {
                        let conn_y = intersect(&comp.vertices(), &child_chi);
                        self.find_decomp_rec(comp, &conn_y, allowed_full, ctx)
                    })
                    .collect();

                let mut subtrees = Vec::with_capacity(results.len());
                let mut rejected = false;
                for (comp, result) in comps_c.iter().zip(results) {
                    match result {
                        Some(decomp) => subtrees.push(decomp.root),
                        None => {
                            if self.use_cache {
                                ctx.cache.add_negative(&child_sep, comp);
                            }
                            rejected = true;
                        }
                    }
                }
                if rejected {
                    continue 'child;
                }
                return Some(Decomp {
                    graph: h.clone(),
                    root: Node::with_children(child_chi, child_sep, subtrees),
                });
            }

            // Otherwise search for a parent separator to pair with.
            let conn_and_child = sorted_union(conn, &child_vertices);
            let allowed_parent = filter_vertices(&allowed, &conn_and_child);
            let parent_pred = ParentCheck {
                conn: conn.to_vec(),
                child: child_vertices.clone(),
            };
            let mut parent_search =
                SeparatorSearch::new(h, &allowed_parent, self.k, self.bal_factor);

            'parent: loop {
                parent_search.find_next(&parent_pred);
                if parent_search.exhausted {
                    break;
                }
                let parent_sep = allowed_parent.subset(&parent_search.result);
                let (comps_p, isolated) = h.get_components(&parent_sep);

                let limit = balance_limit(h.len(), self.bal_factor);
                let Some(low_index) = comps_p.iter().position(|c| c.len() > limit) else {
                    panic!(
                        "parent search accepted a separator without a low component: \
                         H = {h:?}, conn = {conn:?}, allowed = {allowed:?}, \
                         child = {child_sep:?}, parent = {parent_sep:?}"
                    );
                };
                let comp_low = &comps_p[low_index];
                let vert_low = comp_low.vertices();
                let child_chi = intersect(&child_vertices, &vert_low);

                // The child's components inside the low component; the
                // balancedness observed during the child search is
                // conserved here since graphs are immutable.
                let (comps_c, _) = comp_low.get_components(&child_sep);
                if self.use_cache && ctx.cache.check_negative(&child_sep, &comps_c) {
                    continue 'parent;
                }

                let mut upper_edges: Vec<Edge> = isolated.slice().to_vec();
                let mut upper_specials: Vec<Edge> = Vec::new();
                for (i, comp) in comps_p.iter().enumerate() {
                    if i != low_index {
                        upper_edges.extend_from_slice(comp.edges().slice());
                        upper_specials.extend_from_slice(comp.specials().slice());
                    }
                }
                let single_comp = comps_p.len() == 1;
                if !single_comp && upper_edges.is_empty() {
                    // The non-low components carry only special edges; no
                    // real edge remains above to cover them.
                    continue 'parent;
                }

                let marker = ctx.fresh_marker(child_chi.clone());

                let upper_task = || -> Option<Decomp> {
                    if single_comp {
                        // No non-low components: the upper decomposition
                        // is the parent with the marker leaf, no
                        // recursion needed.
                        let up_graph = Graph::with_specials(
                            parent_sep.clone(),
                            Edges::new(vec![marker.clone()]),
                        );
                        let leaf = Node::new(child_chi.clone(), Edges::new(vec![marker.clone()]));
                        let root = Node::with_children(
                            intersect(&parent_sep.vertices(), &vertices_h),
                            parent_sep.clone(),
                            vec![leaf],
                        );
                        Some(Decomp {
                            graph: up_graph,
                            root,
                        })
                    } else {
                        let mut specials = upper_specials.clone();
                        specials.push(marker.clone());
                        let comp_up = Graph::with_specials(
                            Edges::new(upper_edges.clone()),
                            Edges::new(specials),
                        );
                        // Shrink the search space monotonically: the low
                        // component's edges can never reappear above.
                        let allowed_reduced = allowed_full.difference(comp_low.edges());
                        self.find_decomp_rec(&comp_up, conn, &allowed_reduced, ctx)
                    }
                };
                let children_task = || -> Vec<Option<Decomp>> {
                    comps_c
                        .par_iter()
                        .map(|comp| {
                            let conn_x = intersect(&comp.vertices(), &child_chi);
                            self.find_decomp_rec(comp, &conn_x, allowed_full, ctx)
                        })
                        .collect()
                };

                let (upper_result, child_results) = rayon::join(upper_task, children_task);

                // All siblings are drained so every failure is recorded.
                let mut subtrees = Vec::with_capacity(child_results.len());
                let mut rejected = false;
                for (comp, result) in comps_c.iter().zip(child_results) {
                    match result {
                        Some(decomp) => subtrees.push(decomp.root),
                        None => {
                            if self.use_cache {
                                ctx.cache.add_negative(&child_sep, comp);
                            }
                            rejected = true;
                        }
                    }
                }
                if rejected {
                    continue 'parent;
                }
                let Some(upper) = upper_result else {
                    continue 'parent;
                };
                assert!(
                    is_subset(conn, &upper.root.bag),
                    "upper decomposition does not cover the connector: \
                     bag = {:?}, H = {h:?}, conn = {conn:?}, allowed = {allowed:?}, \
                     child = {child_sep:?}, parent = {parent_sep:?}",
                    upper.root.bag
                );

                let root_child = Node::with_children(child_chi, child_sep, subtrees);
                let final_root = attach(&upper.root, root_child, &marker);
                return Some(Decomp {
                    graph: h.clone(),
                    root: final_root,
                });
            }
        }

        // Both loops exhausted: no decomposition at this width.
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_hypergraph;

    fn solve(text: &str, k: usize) -> (Graph, Option<Decomp>) {
        let (graph, _) = parse_hypergraph(text).unwrap();
        let decomp = LogKEngine::new(graph.clone(), k).find_decomp();
        (graph, decomp)
    }

    fn assert_solves(text: &str, k: usize) -> Decomp {
        let (graph, decomp) = solve(text, k);
        let decomp = decomp.unwrap_or_else(|| panic!("expected a width-{k} decomposition"));
        assert!(decomp.check_correct(&graph), "decomposition is incorrect");
        assert!(decomp.width() <= k, "width {} exceeds {k}", decomp.width());
        decomp
    }

    #[test]
    fn empty_graph_is_a_single_empty_node() {
        let decomp = LogKEngine::new(Graph::default(), 1)
            .find_decomp()
            .expect("empty graph decomposes trivially");
        assert!(decomp.root.bag.is_empty());
        assert!(decomp.root.children.is_empty());
        assert!(decomp.check_correct(&Graph::default()));
    }

    #[test]
    fn few_edges_collapse_to_a_single_node() {
        let decomp = assert_solves("e1(a,b), e2(b,c)", 2);
        assert!(decomp.root.children.is_empty());
        assert_eq!(decomp.root.cover.len(), 2);
    }

    #[test]
    fn single_wide_edge_has_width_one() {
        let decomp = assert_solves("e1(a,b,c,d,e,f,g)", 1);
        assert_eq!(decomp.width(), 1);
    }

    #[test]
    fn chain_decomposes_at_width_one() {
        let decomp = assert_solves("e1(a,b), e2(b,c), e3(c,d)", 1);
        // Three bags: the middle edge roots the two ends.
        assert_eq!(decomp.root.bag.len(), 2);
        assert_eq!(decomp.root.children.len(), 2);
    }

    #[test]
    fn triangle_fails_at_width_one() {
        let (_, decomp) = solve("e1(a,b), e2(b,c), e3(a,c)", 1);
        assert!(decomp.is_none());
    }

    #[test]
    fn triangle_decomposes_at_width_two_into_one_bag() {
        let (graph, decomp) = solve("e1(a,b), e2(b,c), e3(a,c)", 2);
        let decomp = decomp.expect("triangles have width 2");
        assert!(decomp.check_correct(&graph));
        // A single bag {a, b, c} covered by two of the three edges.
        assert_eq!(decomp.root.bag, graph.vertices());
        assert!(decomp.root.children.is_empty());
        assert_eq!(decomp.root.cover.len(), 2);
    }

    #[test]
    fn disjoint_triangles_decompose_at_width_two() {
        assert_solves("e1(a,b), e2(b,c), e3(a,c), f1(x,y), f2(y,z), f3(x,z)", 2);
    }

    #[test]
    fn three_cycle_of_ternary_edges_needs_width_two() {
        let text = "e1(a,b,c), e2(c,d,e), e3(e,f,a)";
        let (_, at_one) = solve(text, 1);
        assert!(at_one.is_none(), "no single edge separates the cycle");
        assert_solves(text, 2);
    }

    #[test]
    fn star_decomposes_at_width_one() {
        let text = "e1(c,x1), e2(c,x2), e3(c,x3), e4(c,x4), e5(c,x5), e6(c,x6), e7(c,x7), e8(c,x8)";
        let decomp = assert_solves(text, 1);
        assert_eq!(decomp.width(), 1);
    }

    #[test]
    fn long_chain_exercises_the_parent_branch() {
        let text = "e1(a,b), e2(b,c), e3(c,d), e4(d,e), e5(e,f), e6(f,g), e7(g,h), e8(h,i)";
        assert_solves(text, 1);
    }

    #[test]
    fn grid_rows_and_columns_decompose_at_width_three() {
        let text = "r1(a1,a2,a3), r2(b1,b2,b3), r3(c1,c2,c3), \
                    q1(a1,b1,c1), q2(a2,b2,c2), q3(a3,b3,c3)";
        assert_solves(text, 3);
    }

    #[test]
    fn success_is_monotone_in_k() {
        let text = "e1(a,b), e2(b,c), e3(c,d)";
        for k in 1..=4 {
            assert_solves(text, k);
        }
    }

    #[test]
    fn disabling_the_cache_does_not_change_correctness() {
        let text = "e1(a,b), e2(b,c), e3(c,d), e4(d,e), e5(e,f), e6(f,g), e7(g,h), e8(h,i)";
        let (graph, _) = parse_hypergraph(text).unwrap();
        let decomp = LogKEngine::new(graph.clone(), 1)
            .without_negative_cache()
            .find_decomp()
            .expect("chain still decomposes without the cache");
        assert!(decomp.check_correct(&graph));

        let (triangle, _) = parse_hypergraph("e1(a,b), e2(b,c), e3(a,c)").unwrap();
        assert!(LogKEngine::new(triangle, 1)
            .without_negative_cache()
            .find_decomp()
            .is_none());
    }

    #[test]
    fn larger_balance_factor_still_produces_correct_trees() {
        let text = "e1(a,b), e2(b,c), e3(c,d), e4(d,e), e5(e,f)";
        let (graph, _) = parse_hypergraph(text).unwrap();
        let decomp = LogKEngine::new(graph.clone(), 2)
            .with_balance_factor(3)
            .find_decomp()
            .expect("width 2 suffices for a chain");
        assert!(decomp.check_correct(&graph));
        assert!(decomp.width() <= 2);
    }

    #[test]
    fn random_caterpillars_decompose_at_width_one() {
        use rand::prelude::*;
        use rand_xorshift::XorShiftRng;

        let mut rng = XorShiftRng::seed_from_u64(0xBA1A);
        for round in 0..10 {
            // Edges sharing exactly one vertex with their predecessor form
            // an acyclic hypergraph, so width 1 always suffices.
            let m = rng.random_range(4..10u32);
            let mut next_vertex = 1000u32;
            let mut fresh = || {
                next_vertex += 1;
                next_vertex
            };
            let mut link = fresh();
            let mut edges = Vec::new();
            for name in 1..=m {
                let arity = rng.random_range(2..=4);
                let mut vertices = vec![link];
                for _ in 1..arity {
                    vertices.push(fresh());
                }
                link = *vertices.last().unwrap();
                edges.push(Edge::new(name, vertices));
            }
            let graph = Graph::new(Edges::new(edges));

            let decomp = LogKEngine::new(graph.clone(), 1)
                .find_decomp()
                .unwrap_or_else(|| panic!("round {round}: acyclic graph must decompose at k=1"));
            assert!(decomp.check_correct(&graph), "round {round}");
            assert_eq!(decomp.width(), 1, "round {round}");
        }
    }

    #[test]
    fn check_correct_rejects_uncovered_edges() {
        let (chain, decomp) = solve("e1(a,b), e2(b,c), e3(c,d)", 1);
        let decomp = decomp.unwrap();
        assert!(decomp.check_correct(&chain));
        // The same graph with an extra edge the tree never covers.
        let mut edges = chain.edges().slice().to_vec();
        let d = *edges[2].vertices().last().unwrap();
        edges.push(Edge::new(100, vec![d, 101]));
        let bigger = Graph::new(Edges::new(edges));
        assert!(!decomp.check_correct(&bigger));
    }
}
