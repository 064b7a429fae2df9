use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use contexture::{
    load_collections, write_collection, ChunkEngine, Document, EngineConfig, FailureMode,
    Metadata, RemoteSummarizer, RetryPolicy, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};

#[derive(Parser)]
#[command(name = "contexture", about = "Chunk documents with LLM-guided boundaries")]
struct Args {
    /// Directory of raw text documents (.txt / .md, searched recursively)
    input_dir: PathBuf,

    /// Output directory for per-document chunk collections
    #[arg(long, default_value = "data/chunks")]
    out_dir: PathBuf,

    /// Base URL of the chat-completions endpoint
    #[arg(long, default_value = "http://localhost:8000")]
    endpoint: String,

    #[arg(long, default_value = "qwen3-1.7b")]
    model: String,

    /// Candidate size budget, in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive candidates, in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Maximum attempts per model call
    #[arg(long, default_value_t = 5)]
    max_attempts: usize,

    /// Abort a document on an undecodable model reply instead of degrading
    #[arg(long)]
    fail_fast: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let start_time = Instant::now();
    println!("=== contexture: LLM-guided document chunking ===\n");

    // Step 1: collect documents
    let step1_start = Instant::now();
    println!("Step 1: Scanning {}...", args.input_dir.display());
    let mut paths: Vec<PathBuf> = WalkDir::new(&args.input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    paths.sort();

    let step1_duration = step1_start.elapsed();
    println!(
        "✓ Found {} documents [{:.2}s]\n",
        paths.len(),
        step1_duration.as_secs_f64()
    );

    // Step 2: build the engine
    println!("Step 2: Connecting to {}...", args.endpoint);
    let failure_mode = if args.fail_fast {
        FailureMode::Fast
    } else {
        FailureMode::Soft
    };
    let retry = RetryPolicy::linear(args.max_attempts, Duration::from_secs(60));
    let summarizer = RemoteSummarizer::with_options(&args.endpoint, &args.model, retry, failure_mode);
    let engine = ChunkEngine::with_config(
        summarizer,
        EngineConfig {
            chunk_size: args.chunk_size,
            chunk_overlap: args.chunk_overlap,
            ..EngineConfig::default()
        },
    );
    println!(
        "✓ Engine ready (chunk_size={}, overlap={}, model={})\n",
        args.chunk_size, args.chunk_overlap, args.model
    );

    // Step 3: chunk each document independently
    let step3_start = Instant::now();
    println!("Step 3: Chunking documents...\n");
    let mut total_chunks = 0;
    let mut failed = 0;

    for path in &paths {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read document {}", path.display()))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        let mut metadata = Metadata::new();
        metadata.insert("filename".into(), filename.clone().into());
        metadata.insert("source".into(), path.display().to_string().into());
        let document = Document::with_metadata(content, metadata);

        match engine.split_document(&document) {
            Ok(chunks) => {
                write_collection(&args.out_dir, &stem, &chunks)?;
                println!("  {} - {} chunks", filename, chunks.len());
                total_chunks += chunks.len();
            }
            Err(e) => {
                // One bad document should not kill the batch.
                eprintln!("  ✗ {} failed: {}", filename, e);
                failed += 1;
            }
        }
    }

    let step3_duration = step3_start.elapsed();
    println!(
        "\n✓ Chunking complete [{:.2}s]\n",
        step3_duration.as_secs_f64()
    );

    // Step 4: reload collections, assigning corpus-wide indices
    let step4_start = Instant::now();
    println!("Step 4: Verifying persisted collections...");
    let loaded = load_collections(&args.out_dir)?;
    let step4_duration = step4_start.elapsed();
    println!(
        "✓ Loaded {} chunks back [{:.2}s]\n",
        loaded.len(),
        step4_duration.as_secs_f64()
    );

    // Statistics
    let total_duration = start_time.elapsed();
    println!("=== Pipeline Statistics ===");
    println!("Documents:            {}", paths.len());
    println!("Failed documents:     {}", failed);
    println!("Chunks written:       {}", total_chunks);
    println!("Chunks loaded back:   {}", loaded.len());
    println!(
        "Avg chunks/document:  {:.1}",
        if paths.len() > failed {
            total_chunks as f64 / (paths.len() - failed) as f64
        } else {
            0.0
        }
    );
    println!("Total execution:      {:.3}s", total_duration.as_secs_f64());

    Ok(())
}
