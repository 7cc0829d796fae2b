//! Benchmarks for separator-induced component splitting, the hot
//! operation inside every predicate check.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hypertree::edges::{Edge, Edges};
use hypertree::graph::Graph;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use std::hint::black_box;

/// A rows × cols grid hypergraph: one hyperedge per row and per column,
/// intersecting in the cell vertices.
fn grid_graph(rows: usize, cols: usize) -> Graph {
    let cell = |r: usize, c: usize| (r * cols + c + 1) as u32;
    let mut edges = Vec::with_capacity(rows + cols);
    for r in 0..rows {
        edges.push(Edge::new(
            (r + 1) as u32,
            (0..cols).map(|c| cell(r, c)).collect(),
        ));
    }
    for c in 0..cols {
        edges.push(Edge::new(
            (rows + c + 1) as u32,
            (0..rows).map(|r| cell(r, c)).collect(),
        ));
    }
    Graph::new(Edges::new(edges))
}

/// Picks `width` distinct edges of `graph` as a separator.
fn random_separator(graph: &Graph, width: usize, rng: &mut XorShiftRng) -> Edges {
    let n = graph.edge_count();
    let mut indices: Vec<usize> = Vec::with_capacity(width);
    while indices.len() < width {
        let i = rng.random_range(0..n);
        if !indices.contains(&i) {
            indices.push(i);
        }
    }
    graph.edges().subset(&indices)
}

fn bench_get_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_components");

    for &(rows, cols, width) in &[(10usize, 10usize, 2usize), (20, 20, 2), (20, 20, 3)] {
        let graph = grid_graph(rows, cols);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let sep = random_separator(&graph, width, &mut rng);
        group.bench_function(
            BenchmarkId::from_parameter(format!("{rows}x{cols}_w{width}")),
            |b| {
                b.iter(|| black_box(graph.get_components(&sep)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_get_components);
criterion_main!(benches);
