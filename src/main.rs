use hypertree::engine::LogKEngine;
use hypertree::graph::Graph;
use hypertree::parse::load_hypergraph;
use std::io::Write;
use std::time::Instant;

fn main() {
    let mut graph_path: Option<String> = None;
    let mut width: usize = 0;
    let mut bal_factor: usize = 2;
    let mut csv_path: Option<String> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--graph" => {
                graph_path = Some(args.get(i + 1).cloned().unwrap_or_else(|| usage_and_exit(2)));
                i += 2;
            }
            "--width" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                width = v.parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--balance" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                bal_factor = v.parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--csv" => {
                csv_path = Some(args.get(i + 1).cloned().unwrap_or_else(|| usage_and_exit(2)));
                i += 2;
            }
            "--help" | "-h" => usage_and_exit(0),
            _ => usage_and_exit(2),
        }
    }

    let Some(graph_path) = graph_path else {
        usage_and_exit(2)
    };
    if width == 0 || bal_factor < 2 {
        usage_and_exit(2)
    }

    let (graph, names) = match load_hypergraph(&graph_path) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{graph_path}: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "Graph: {} edges, {} vertices | width bound: {width}",
        graph.edge_count(),
        graph.vertices().len()
    );

    let engine = LogKEngine::new(graph.clone(), width).with_balance_factor(bal_factor);
    let start = Instant::now();
    let decomp = engine.find_decomp();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;

    match &decomp {
        Some(d) => {
            println!("Result: {}", d.root.render(&names));
            println!(
                "Width: {} | correct: {} | time: {elapsed_ms:.3} ms",
                d.width(),
                d.check_correct(&graph)
            );
        }
        None => println!("No decomposition of width {width} exists | time: {elapsed_ms:.3} ms"),
    }

    if let Some(csv) = csv_path {
        if let Err(e) = append_csv(&csv, &graph_path, &graph, width, elapsed_ms, decomp.is_some())
        {
            eprintln!("{csv}: {e}");
        }
    }
}

/// Appends one benchmark row, writing the header when the file is new.
fn append_csv(
    path: &str,
    graph_path: &str,
    graph: &Graph,
    width: usize,
    elapsed_ms: f64,
    decomposed: bool,
) -> std::io::Result<()> {
    let is_new = !std::path::Path::new(path).exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    if is_new {
        writeln!(file, "graph;edges;vertices;width;time_ms;decomposed")?;
    }
    writeln!(
        file,
        "{};{};{};{};{:.5};{}",
        graph_path,
        graph.edge_count(),
        graph.vertices().len(),
        width,
        elapsed_ms,
        decomposed
    )
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  hypertree --graph PATH --width K [--balance B] [--csv PATH]\n\nOptions:\n  --graph PATH   Hypergraph file: edges as Name(v1, v2, ...), separated by commas or newlines\n  --width K      Positive width bound for the decomposition\n  --balance B    Balance factor (default: 2)\n  --csv PATH     Append a timing row to a CSV benchmark log\n"
    );
    std::process::exit(code)
}
