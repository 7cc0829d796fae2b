//! # Hypertree
//!
//! A parallel engine for computing **generalized hypertree decompositions**
//! (GHDs) of bounded width.
//!
//! Given a hypergraph and a width bound `k`, [`engine::LogKEngine`] either
//! returns a labelled tree witnessing generalized hypertree width ≤ `k`,
//! or reports that no such decomposition exists. The search is a
//! balanced-separator divide-and-conquer: every recursive level picks a
//! child separator (and, when needed, a parent separator) of at most `k`
//! hyperedges such that the induced subproblems shrink by a constant
//! factor, which bounds the recursion depth logarithmically in the number
//! of edges. Subproblems are decomposed in parallel, and separator
//! candidates are enumerated by racing workers over disjoint shards of
//! the k-subset space.
//!
//! ## Quick Start
//!
//! ```
//! use hypertree::engine::LogKEngine;
//! use hypertree::parse::parse_hypergraph;
//!
//! let (graph, names) = parse_hypergraph("e1(a,b), e2(b,c), e3(c,d)").unwrap();
//! let engine = LogKEngine::new(graph.clone(), 2);
//!
//! let decomp = engine.find_decomp().expect("chains have width 1");
//! assert!(decomp.check_correct(&graph));
//! assert!(decomp.width() <= 2);
//! println!("{}", decomp.root.render(&names));
//! ```
//!
//! ## Modules
//!
//! - [`edges`]: Hyperedges, edge collections, and vertex-set utilities.
//! - [`graph`]: Hypergraphs and separator-induced component splitting.
//! - [`combin`]: Shardable lexicographic enumeration of k-subsets.
//! - [`search`]: The parallel separator search and its predicates.
//! - [`cache`]: Negative memoization of failed subproblems.
//! - [`tree`]: Decomposition tree nodes and the stitch operation.
//! - [`engine`]: The recursive log-depth decomposition engine.
//! - [`parse`]: The hypergraph text format and identifier interning.
//!
//! ## Notes
//!
//! - Failure ("no decomposition at this width") is an ordinary `None`
//!   return; panics indicate engine bugs, never unlucky inputs.
//! - Graphs are immutable once constructed and freely shared across the
//!   worker threads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)] // Mathematical naming: comps_c, comps_p, …
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::return_self_not_must_use)]

pub mod cache;
pub mod combin;
pub mod edges;
pub mod engine;
pub mod graph;
pub mod parse;
pub mod search;
pub mod tree;

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::edges::{Edge, Edges, Vertex};
    pub use crate::engine::{Decomp, LogKEngine};
    pub use crate::graph::Graph;
    pub use crate::parse::{load_hypergraph, parse_hypergraph, Interner, ParseError};
    pub use crate::tree::Node;
}
