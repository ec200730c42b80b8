mod seed;

use std::env;
use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use oracle_core::config::Config;
use oracle_graph::MemoryGraphStore;
use oracle_hybrid::{HybridRetrieval, RetrievalOptions};
use oracle_vector::MemoryVectorStore;

const USAGE: &str = "Usage: oracle-cli <query|health|stats> [args...]
  query \"<text>\" [--max N] [--graph-only|--vector-only] [--threshold T] [--repeat N]
  health
  stats";

struct QueryArgs {
    text: String,
    options: RetrievalOptions,
    repeat: usize,
}

fn usage_exit(msg: &str) -> ! {
    eprintln!("Error: {}\n{}", msg, USAGE);
    std::process::exit(1)
}

fn parse_number<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    args.get(i + 1).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage_exit(&format!("{} requires a number", flag)))
}

fn parse_query_args(args: &[String]) -> QueryArgs {
    let mut text = None;
    let mut options = RetrievalOptions::default();
    let mut repeat = 1;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--max" => { options.max_sources = parse_number(args, i, "--max"); i += 1; }
            "--threshold" => { options.similarity_threshold = Some(parse_number(args, i, "--threshold")); i += 1; }
            "--repeat" => { repeat = parse_number::<usize>(args, i, "--repeat").max(1); i += 1; }
            "--graph-only" => options.include_vector = false,
            "--vector-only" => options.include_graph = false,
            a if !a.starts_with('-') && text.is_none() => text = Some(a.to_string()),
            other => usage_exit(&format!("unexpected argument '{}'", other)),
        }
        i += 1;
    }
    let text = text.unwrap_or_else(|| usage_exit("query text is required"));
    QueryArgs { text, options, repeat }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oracle=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { usage_exit("missing command"); }
    let cmd = args.remove(0);

    let retrieval = config.retrieval()?;
    let seed_dir = config.path("data.seed_dir", "data/seed");
    let seed = seed::load_seed_dir(&seed_dir)?;
    let graph = Arc::new(MemoryGraphStore::new());
    let vector = Arc::new(MemoryVectorStore::default());
    seed.populate(&graph, &vector)?;
    tracing::info!(seed_dir = %seed_dir.display(), entities = graph.entity_count(), documents = vector.len(), "Seed data loaded");

    let engine = HybridRetrieval::new(retrieval)?.with_graph(graph.clone()).with_vector(vector.clone());

    match cmd.as_str() {
        "query" => {
            let q = parse_query_args(&args);
            for _ in 0..q.repeat {
                let result = engine.retrieve_knowledge(&q.text, &q.options).await?;
                let out = json!({
                    "query": q.text,
                    "cache_hit": result.cache_hit,
                    "query_time_ms": result.query_time.as_secs_f64() * 1000.0,
                    "graph": result.graph.to_string(),
                    "vector": result.vector.to_string(),
                    "sources": result.sources,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            if q.repeat > 1 {
                println!("{}", serde_json::to_string_pretty(&engine.get_cache_stats())?);
            }
        }
        "health" => {
            println!("{}", serde_json::to_string_pretty(&engine.health_check().await)?);
        }
        "stats" => {
            let out = json!({
                "seed_dir": seed_dir.display().to_string(),
                "entities": graph.entity_count(),
                "documents": vector.len(),
                "retrieval": engine.config(),
                "cache": engine.get_cache_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        other => usage_exit(&format!("unknown command '{}'", other)),
    }
    Ok(())
}
