//! Clause Risk Engine: CLI entrypoint
//! Reads one document (file or stdin), runs the full analysis and prints the report as JSON.
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clause_risk_engine::config::EngineConfig;
use clause_risk_engine::metrics::Metrics;
use clause_risk_engine::Analyzer;

#[derive(Debug, Parser)]
#[command(name = "clause-risk-engine", version, about = "Analyze a legal document for clause-level risk")]
struct Cli {
    /// Document to analyze (`-` reads stdin)
    #[arg(value_name = "FILE|-")]
    input: PathBuf,

    /// Engine config TOML (default: $ENGINE_CONFIG_PATH, then config/engine.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    metrics: bool,
}

/// `LOG_FORMAT=json` switches to JSON lines; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clause_risk_engine=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading document from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading document {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let metrics = if cli.metrics {
        Some(Metrics::init()?)
    } else {
        None
    };

    let cfg = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    let analyzer = Analyzer::from_config(&cfg)?;

    let text = read_input(&cli.input)?;
    let report = analyzer.analyze(&text).await;
    info!(
        doc_id = %report.doc_id,
        clauses = report.total_clauses,
        score = report.risk.overall_score,
        "report ready"
    );

    let out = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
