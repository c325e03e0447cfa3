//! Scholia CLI: build concept graphs from paper directories and query them.
//!
//! Usage:
//!   scholia build <dir> [--batch id] [--config strategy.yaml] [--db path]
//!   scholia list | show | export | path | rank | order | delete  [--db path]

use clap::{Parser, Subcommand};
use scholia::corpus::load_directory;
use scholia::{
    BatchId, BatchPipeline, CancellationToken, ConceptId, EngineConfig, GraphSnapshot, OpenStore,
    OrderQuery, PathQuery, RelationshipKind, ScholiaEngine, SnapshotStore, SqliteStore,
    VisualizationExport,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "scholia",
    version,
    about = "Multi-strategy concept extraction for academic papers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract concepts from a directory of papers and publish the batch
    Build {
        /// Directory of .txt / .md papers
        dir: PathBuf,
        /// Batch id (random when omitted; reusing an id replaces that batch)
        #[arg(long)]
        batch: Option<String>,
        /// YAML strategy file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Domain tag for papers without one
        #[arg(long)]
        domain: Option<String>,
    },
    /// List stored batches
    List,
    /// Print a batch's hierarchy and quality report
    Show {
        batch: String,
        /// Print only concepts at this depth (roots are level 0)
        #[arg(long)]
        level: Option<usize>,
    },
    /// Write the node/edge visualization JSON
    Export {
        batch: String,
        /// Drop concepts below this confidence
        #[arg(long)]
        min_confidence: Option<f64>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Shortest conceptual path between two concepts
    Path {
        batch: String,
        from: String,
        to: String,
        /// Follow only hierarchy edges, downward
        #[arg(long)]
        hierarchy: bool,
    },
    /// Most central concepts by importance rank
    Rank {
        batch: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// YAML strategy file supplying damping, iterations and edge kinds
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Concepts in prerequisite order (parents before children)
    Order { batch: String },
    /// Delete a batch
    Delete { batch: String },
}

/// Get the default database path (~/.local/share/scholia/scholia.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let scholia_dir = data_dir.join("scholia");
    std::fs::create_dir_all(&scholia_dir).ok();
    scholia_dir.join("scholia.db")
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn open_store(db: Option<PathBuf>) -> Result<Arc<SqliteStore>, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path)
        .map(Arc::new)
        .map_err(|e| format!("Failed to open database: {}", e))
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("Failed to load config: {}", e)),
        None => Ok(EngineConfig::default()),
    }
}

fn load_snapshot(store: &SqliteStore, batch: &str) -> Result<GraphSnapshot, String> {
    store
        .load_snapshot(&BatchId::from(batch))
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("batch '{}' not found", batch))
}

fn resolve(snapshot: &GraphSnapshot, name: &str) -> Result<ConceptId, String> {
    snapshot
        .find_by_name(name)
        .map(|c| c.id)
        .ok_or_else(|| format!("concept '{}' not found", name))
}

fn name_of(snapshot: &GraphSnapshot, id: &ConceptId) -> String {
    snapshot
        .concept(id)
        .map(|c| c.canonical_name.clone())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(feature = "embeddings")]
fn with_embedder(pipeline: BatchPipeline) -> BatchPipeline {
    match scholia::extraction::FastEmbedEmbedder::default_model() {
        Ok(embedder) => pipeline.with_embedder(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!(error = %e, "embedding model unavailable, continuing without it");
            pipeline
        }
    }
}

#[cfg(not(feature = "embeddings"))]
fn with_embedder(pipeline: BatchPipeline) -> BatchPipeline {
    pipeline
}

fn cmd_build(
    store: Arc<SqliteStore>,
    dir: &PathBuf,
    batch: Option<String>,
    config: Option<&PathBuf>,
    domain: Option<String>,
) -> Result<(), String> {
    let mut config = load_config(config)?;
    if domain.is_some() {
        config.domain = domain;
    }
    let corpus = load_directory(dir, config.domain.as_deref()).map_err(|e| e.to_string())?;
    let batch_id = batch.map(BatchId::from_string).unwrap_or_default();
    let pipeline = with_embedder(BatchPipeline::new(config));

    let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    let snapshot = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        pipeline.run(batch_id, &corpus, &cancel).await
    });
    let snapshot = snapshot.map_err(|e| e.to_string())?;

    let engine = ScholiaEngine::with_store(store);
    let snapshot = engine.publish(snapshot).map_err(|e| e.to_string())?;
    let report = snapshot.report();
    println!(
        "Built batch {}: {} papers, {} concepts ({} low confidence), {} relationships",
        snapshot.batch_id(),
        report.paper_count,
        report.concept_count,
        report.low_confidence,
        report.relationship_count
    );
    for warning in &report.warnings {
        eprintln!("Warning: {}", serde_json::to_string(warning).map_err(|e| e.to_string())?);
    }
    Ok(())
}

fn cmd_list(store: &SqliteStore) -> Result<(), String> {
    let summaries = store.batch_summaries().map_err(|e| e.to_string())?;
    if summaries.is_empty() {
        println!("No batches stored.");
        return Ok(());
    }
    println!("{:<36}  {:<20}  {:>8}  {:>8}", "BATCH", "CREATED", "CONCEPTS", "EDGES");
    println!("{}", "-".repeat(78));
    for s in summaries {
        println!(
            "{:<36}  {:<20}  {:>8}  {:>8}",
            s.batch_id.as_str(),
            s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.concept_count,
            s.relationship_count
        );
    }
    Ok(())
}

fn print_subtree(snapshot: &GraphSnapshot, id: ConceptId, depth: usize) {
    let Some(concept) = snapshot.concept(&id) else {
        return;
    };
    let marker = if concept.is_low_confidence() { " ?" } else { "" };
    println!(
        "{}{} [{}] {:.2} ({} evidence){}",
        "  ".repeat(depth),
        concept.canonical_name,
        concept.category,
        concept.confidence,
        concept.evidence_count(),
        marker
    );
    for child in snapshot.hierarchy().children(&id) {
        print_subtree(snapshot, child, depth + 1);
    }
}

fn cmd_show(store: &SqliteStore, batch: &str, level: Option<usize>) -> Result<(), String> {
    let snapshot = load_snapshot(store, batch)?;
    match level {
        Some(level) => {
            for concept in snapshot.concepts_at_level(level) {
                println!("{} [{}] {:.2}", concept.canonical_name, concept.category, concept.confidence);
            }
        }
        None => {
            for root in snapshot.hierarchy().roots() {
                print_subtree(&snapshot, root, 0);
            }
        }
    }
    let report = serde_json::to_string_pretty(snapshot.report()).map_err(|e| e.to_string())?;
    println!("\n{}", report);
    Ok(())
}

fn cmd_export(
    store: &SqliteStore,
    batch: &str,
    min_confidence: Option<f64>,
    out: Option<&PathBuf>,
) -> Result<(), String> {
    let snapshot = load_snapshot(store, batch)?;
    let mut export = VisualizationExport::from_snapshot(&snapshot);
    if let Some(floor) = min_confidence {
        export = export.min_confidence(floor);
    }
    let json = export.to_json().map_err(|e| e.to_string())?;
    match out {
        Some(path) => std::fs::write(path, json).map_err(|e| e.to_string())?,
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_path(store: &SqliteStore, batch: &str, from: &str, to: &str, hierarchy: bool) -> Result<(), String> {
    let snapshot = load_snapshot(store, batch)?;
    let mut query = PathQuery::between(resolve(&snapshot, from)?, resolve(&snapshot, to)?);
    if hierarchy {
        query = query.with_kind(RelationshipKind::ParentOf);
    } else {
        query = query.direction(scholia::Direction::Both);
    }
    let path = query.execute(snapshot.graph());
    if path.is_empty() {
        println!("No path from '{}' to '{}'", from, to);
        return Ok(());
    }
    let names: Vec<String> = path.iter().map(|id| name_of(&snapshot, id)).collect();
    println!("{}", names.join(" -> "));
    Ok(())
}

fn cmd_rank(store: &SqliteStore, batch: &str, top: usize, config: Option<&PathBuf>) -> Result<(), String> {
    let config = load_config(config)?;
    let snapshot = load_snapshot(store, batch)?;
    let ranks = config
        .rank_query()
        .execute(snapshot.graph(), &CancellationToken::new())
        .map_err(|e| e.to_string())?;
    for (id, score) in ranks.top_k(top) {
        println!("{:.4}  {}", score, name_of(&snapshot, &id));
    }
    Ok(())
}

fn cmd_order(store: &SqliteStore, batch: &str) -> Result<(), String> {
    let snapshot = load_snapshot(store, batch)?;
    let order = OrderQuery::hierarchy()
        .execute(snapshot.graph())
        .map_err(|e| e.to_string())?;
    for (i, id) in order.iter().enumerate() {
        println!("{:>4}. {}", i + 1, name_of(&snapshot, id));
    }
    Ok(())
}

fn cmd_delete(store: &SqliteStore, batch: &str) -> Result<(), String> {
    if store.delete_snapshot(&BatchId::from(batch)).map_err(|e| e.to_string())? {
        println!("Deleted batch '{}'", batch);
        Ok(())
    } else {
        Err(format!("batch '{}' not found", batch))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match open_store(cli.db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let result = match cli.command {
        Commands::Build {
            dir,
            batch,
            config,
            domain,
        } => cmd_build(Arc::clone(&store), &dir, batch, config.as_ref(), domain),
        Commands::List => cmd_list(&store),
        Commands::Show { batch, level } => cmd_show(&store, &batch, level),
        Commands::Export {
            batch,
            min_confidence,
            out,
        } => cmd_export(&store, &batch, min_confidence, out.as_ref()),
        Commands::Path {
            batch,
            from,
            to,
            hierarchy,
        } => cmd_path(&store, &batch, &from, &to, hierarchy),
        Commands::Rank { batch, top, config } => cmd_rank(&store, &batch, top, config.as_ref()),
        Commands::Order { batch } => cmd_order(&store, &batch),
        Commands::Delete { batch } => cmd_delete(&store, &batch),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
