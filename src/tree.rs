//! Decomposition tree nodes and the stitch operation.
//!
//! Nodes carry no parent pointers; the running-intersection checker
//! builds a preorder arena with parent indices on demand instead of
//! threading back-references through the tree.

use crate::edges::{is_subset, set_contains, sorted_union, Edge, Edges, Vertex};
use crate::parse::Interner;
use rustc_hash::FxHashMap;

// ============================================================================
// Node
// ============================================================================

/// A node of a decomposition tree: a bag of vertices labelled by a cover
/// of hyperedges, plus child subtrees. Bags are sorted vertex sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    /// The vertices this node is responsible for (sorted set).
    pub bag: Vec<Vertex>,
    /// The hyperedges whose vertices subsume the bag.
    pub cover: Edges,
    /// Child subtrees.
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a leaf node.
    pub fn new(bag: Vec<Vertex>, cover: Edges) -> Self {
        debug_assert!(bag.windows(2).all(|w| w[0] < w[1]), "bag must be sorted");
        Self {
            bag,
            cover,
            children: Vec::new(),
        }
    }

    /// Creates a node with children.
    pub fn with_children(bag: Vec<Vertex>, cover: Edges, children: Vec<Node>) -> Self {
        let mut node = Self::new(bag, cover);
        node.children = children;
        node
    }

    /// All vertices in this subtree's bags, as a sorted set.
    pub fn vertices(&self) -> Vec<Vertex> {
        let mut out = self.bag.clone();
        for c in &self.children {
            out = sorted_union(&out, &c.vertices());
        }
        out
    }

    /// Returns whether some bag in this subtree contains all of `e`'s
    /// vertices.
    pub fn covers_edge(&self, e: &Edge) -> bool {
        let wanted = e.vertex_set();
        self.any_node(&|n| is_subset(&wanted, &n.bag))
    }

    /// Returns whether every bag in this subtree is a subset of its
    /// cover's vertex set.
    pub fn bags_inside_covers(&self) -> bool {
        !self.any_node(&|n| !is_subset(&n.bag, &n.cover.vertices()))
    }

    /// The largest cover size in this subtree (the width of the
    /// decomposition rooted here).
    pub fn max_cover_size(&self) -> usize {
        let own = self.cover.len();
        self.children
            .iter()
            .map(Node::max_cover_size)
            .fold(own, usize::max)
    }

    fn any_node(&self, pred: &dyn Fn(&Node) -> bool) -> bool {
        pred(self) || self.children.iter().any(|c| c.any_node(pred))
    }

    /// Renders the subtree as a single-line dump, resolving identifiers
    /// through `names`. Unknown ids (e.g. marker edges, which never
    /// survive into a finished tree) print as `#id`.
    pub fn render(&self, names: &Interner) -> String {
        let mut out = String::new();
        self.render_into(&mut out, names);
        out
    }

    fn render_into(&self, out: &mut String, names: &Interner) {
        let resolve = |id: u32| -> String {
            names
                .resolve(id)
                .map_or_else(|| format!("#{id}"), str::to_owned)
        };
        out.push_str("{bag: ");
        for (i, &v) in self.bag.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&resolve(v));
        }
        out.push_str("; cover: ");
        for (i, e) in self.cover.slice().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&resolve(e.name()));
        }
        if !self.children.is_empty() {
            out.push_str(" [");
            for (i, c) in self.children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                c.render_into(out, names);
            }
            out.push(']');
        }
        out.push('}');
    }
}

// ============================================================================
// Attach (stitch)
// ============================================================================

/// Grafts `below` into `above`, replacing the unique leaf whose cover is
/// exactly the marker edge.
///
/// The marker is the special edge introduced when the upper subproblem
/// was built, so by construction the matching node is a leaf. The inputs
/// are not mutated; untouched subtrees are cloned.
///
/// # Panics
/// Panics if no leaf carries the marker cover, or more than one does.
/// Either indicates a bug in the engine, not a decomposition failure.
pub fn attach(above: &Node, below: Node, marker: &Edge) -> Node {
    let mut pending = Some(below);
    let stitched = attach_rec(above, &mut pending, marker);
    assert!(
        pending.is_none(),
        "attach: no leaf with marker cover {:?} in {:?}",
        marker.vertices(),
        above
    );
    stitched
}

fn attach_rec(node: &Node, pending: &mut Option<Node>, marker: &Edge) -> Node {
    if node.cover.len() == 1 && node.cover.slice()[0].name() == marker.name() {
        assert!(
            node.children.is_empty(),
            "attach: marker node is not a leaf: {node:?}"
        );
        return pending
            .take()
            .unwrap_or_else(|| panic!("attach: marker leaf is not unique in tree"));
    }
    Node {
        bag: node.bag.clone(),
        cover: node.cover.clone(),
        children: node
            .children
            .iter()
            .map(|c| attach_rec(c, pending, marker))
            .collect(),
    }
}

// ============================================================================
// Running intersection
// ============================================================================

/// Checks the connectedness condition: for every vertex, the nodes whose
/// bags contain it induce a connected subtree.
///
/// Linear in the tree size: a preorder arena with parent indices is built
/// once, and a vertex violates the condition iff more than one containing
/// node has a parent that does not contain it.
pub fn satisfies_running_intersection(root: &Node) -> bool {
    let mut arena: Vec<(&Node, Option<usize>)> = Vec::new();
    collect(root, None, &mut arena);

    let mut subtree_roots: FxHashMap<Vertex, u32> = FxHashMap::default();
    for (node, parent) in &arena {
        for &v in &node.bag {
            let parent_has = parent.is_some_and(|p| set_contains(&arena[p].0.bag, v));
            if !parent_has {
                let count = subtree_roots.entry(v).or_insert(0);
                *count += 1;
                if *count > 1 {
                    return false;
                }
            }
        }
    }
    true
}

fn collect<'a>(node: &'a Node, parent: Option<usize>, out: &mut Vec<(&'a Node, Option<usize>)>) {
    let idx = out.len();
    out.push((node, parent));
    for c in &node.children {
        collect(c, Some(idx), out);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(name: u32, vertices: &[Vertex]) -> Edge {
        Edge::new(name, vertices.to_vec())
    }

    fn leaf(bag: &[Vertex], cover: Edges) -> Node {
        Node::new(bag.to_vec(), cover)
    }

    /// Root {2,3} with children {1,2} and {3,4}: the chain decomposition.
    fn chain_tree() -> Node {
        Node::with_children(
            vec![2, 3],
            Edges::new(vec![edge(2, &[2, 3])]),
            vec![
                leaf(&[1, 2], Edges::new(vec![edge(1, &[1, 2])])),
                leaf(&[3, 4], Edges::new(vec![edge(3, &[3, 4])])),
            ],
        )
    }

    #[test]
    fn vertices_collects_all_bags() {
        assert_eq!(chain_tree().vertices(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn covers_edge_finds_single_containing_bag() {
        let t = chain_tree();
        assert!(t.covers_edge(&edge(1, &[1, 2])));
        assert!(t.covers_edge(&edge(9, &[3])));
        assert!(!t.covers_edge(&edge(9, &[1, 4])));
    }

    #[test]
    fn bags_inside_covers_detects_violation() {
        let good = chain_tree();
        assert!(good.bags_inside_covers());
        let bad = leaf(&[1, 9], Edges::new(vec![edge(1, &[1, 2])]));
        assert!(!bad.bags_inside_covers());
    }

    #[test]
    fn max_cover_size_is_the_width() {
        let mut t = chain_tree();
        assert_eq!(t.max_cover_size(), 1);
        t.children[0].cover = Edges::new(vec![edge(1, &[1, 2]), edge(7, &[2])]);
        assert_eq!(t.max_cover_size(), 2);
    }

    #[test]
    fn running_intersection_holds_on_chain() {
        assert!(satisfies_running_intersection(&chain_tree()));
    }

    #[test]
    fn running_intersection_detects_split_vertex() {
        // Vertex 1 appears in two leaves but not in the root between them.
        let t = Node::with_children(
            vec![2, 3],
            Edges::new(vec![edge(2, &[2, 3])]),
            vec![
                leaf(&[1, 2], Edges::new(vec![edge(1, &[1, 2])])),
                leaf(&[1, 3], Edges::new(vec![edge(3, &[1, 3])])),
            ],
        );
        assert!(!satisfies_running_intersection(&t));
    }

    #[test]
    fn attach_replaces_the_marker_leaf() {
        let marker = edge(99, &[3, 4]);
        let above = Node::with_children(
            vec![2, 3],
            Edges::new(vec![edge(2, &[2, 3])]),
            vec![
                leaf(&[1, 2], Edges::new(vec![edge(1, &[1, 2])])),
                leaf(&[3, 4], Edges::new(vec![marker.clone()])),
            ],
        );
        let below = Node::with_children(
            vec![3, 4],
            Edges::new(vec![edge(3, &[3, 4])]),
            vec![leaf(&[4, 5], Edges::new(vec![edge(4, &[4, 5])]))],
        );

        let below_vertices = below.vertices();
        let stitched = attach(&above, below, &marker);

        assert_eq!(
            stitched.vertices(),
            sorted_union(&above.vertices(), &below_vertices)
        );
        assert_eq!(stitched.children[1].cover.slice()[0].name(), 3);
        assert!(satisfies_running_intersection(&stitched));
        // The original tree is untouched.
        assert_eq!(above.children[1].cover.slice()[0].name(), 99);
    }

    #[test]
    #[should_panic(expected = "no leaf with marker cover")]
    fn attach_panics_without_marker_leaf() {
        let marker = edge(99, &[3, 4]);
        let above = chain_tree();
        let below = leaf(&[3, 4], Edges::new(vec![edge(3, &[3, 4])]));
        attach(&above, below, &marker);
    }

    #[test]
    #[should_panic(expected = "marker leaf is not unique")]
    fn attach_panics_on_duplicate_marker_leaves() {
        let marker = edge(99, &[3]);
        let above = Node::with_children(
            vec![2, 3],
            Edges::new(vec![edge(2, &[2, 3])]),
            vec![
                leaf(&[3], Edges::new(vec![marker.clone()])),
                leaf(&[3], Edges::new(vec![marker.clone()])),
            ],
        );
        let below = leaf(&[3], Edges::new(vec![edge(3, &[3, 4])]));
        attach(&above, below, &marker);
    }
}
