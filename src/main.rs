//! Review scorer: batch CLI and HTTP service entrypoint.
//!
//! `score` reads a CSV/JSON export, scores every row and writes the result in
//! one go. `serve` exposes the same engine over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_scorer::api::{self, AppState};
use review_scorer::batch::{self, RunOptions};
use review_scorer::io::{read_records, write_output, ReaderOptions};
use review_scorer::metrics::Metrics;
use review_scorer::{Category, KeywordTaxonomy, LexiconPolarity, Scorer};

#[derive(Parser)]
#[command(name = "review-scorer")]
#[command(about = "Rubric keyword scoring and annotation for review text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Taxonomy file (TOML or JSON). Defaults to config/taxonomy.toml, then built-in.
    #[arg(long, env = "TAXONOMY_PATH")]
    taxonomy: Option<PathBuf>,
    /// Blend the generic sentiment signal into the Affective score
    #[arg(long, env = "AFFECTIVE_FUSION")]
    fused: bool,
    /// Categories to annotate (comma separated); all when omitted
    #[arg(long, value_delimiter = ',')]
    annotate: Vec<Category>,
    /// Score batch rows in parallel
    #[arg(long, env = "SCORER_PARALLEL")]
    parallel: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a spreadsheet export and write the scored rows
    Score {
        /// Input file (.csv or .json)
        #[arg(long)]
        input: PathBuf,
        /// Output file (.csv or .json)
        #[arg(long)]
        output: PathBuf,
        /// 0-based row holding the column headers
        #[arg(long, default_value_t = 2)]
        header_row: usize,
        /// Column with the review text
        #[arg(long, default_value = "Review Text")]
        column: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Serve the scoring API over HTTP
    Serve {
        #[arg(long, env = "SCORER_ADDR", default_value = "127.0.0.1:8080")]
        addr: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Compact logs by default; LOG_FORMAT=json switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_scorer=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Load the taxonomy once and compile it; fatal before any row is read.
fn build_scorer(args: &EngineArgs) -> anyhow::Result<Scorer> {
    let taxonomy = match &args.taxonomy {
        Some(p) => KeywordTaxonomy::from_path(p)?,
        None => KeywordTaxonomy::from_env()?,
    };
    let mut scorer = Scorer::new(&taxonomy)?;
    if args.fused {
        scorer = scorer.with_affective_fusion(Arc::new(LexiconPolarity::new()));
    }
    if !args.annotate.is_empty() {
        scorer = scorer.with_annotated_categories(args.annotate.iter().copied());
    }
    Ok(scorer)
}

fn score_file(
    input: PathBuf,
    output: PathBuf,
    reader: ReaderOptions,
    engine: &EngineArgs,
) -> anyhow::Result<()> {
    let scorer = build_scorer(engine)?;
    let records = read_records(&input, &reader)?;
    let scored = batch::run(&scorer, &records, RunOptions { parallel: engine.parallel })
        .context("scoring aborted; no output written")?;
    write_output(&output, &scored)?;
    info!(rows = scored.len(), output = %output.display(), "processed file saved");
    Ok(())
}

async fn serve(addr: String, engine: &EngineArgs) -> anyhow::Result<()> {
    let scorer = build_scorer(engine)?;
    let metrics = Metrics::init()?;
    let state = AppState::new(scorer).with_run(RunOptions {
        parallel: engine.parallel,
    });
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Score {
            input,
            output,
            header_row,
            column,
            engine,
        } => {
            let reader = ReaderOptions {
                header_row,
                text_column: column,
            };
            score_file(input, output, reader, &engine)
        }
        Commands::Serve { addr, engine } => serve(addr, &engine).await,
    };

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "run failed");
    }
    result
}
