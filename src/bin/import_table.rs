use clap::{Parser, ValueEnum};
use saju_engine::adapters::file_store::FileStore;
use saju_engine::core::ingest::{self, IngestReport};
use saju_engine::utils::{logger, validation};
use saju_engine::EngineConfig;
use std::fs::File;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableKind {
    SolarTerms,
    LunarSolar,
}

#[derive(Parser)]
#[command(name = "import-table")]
#[command(about = "Import an astronomical CSV table into the table file")]
struct Args {
    #[arg(value_enum)]
    kind: TableKind,

    /// CSV file to import
    input: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Table file; overrides storage.path from config
    #[arg(long)]
    store: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

async fn run(args: &Args) -> saju_engine::Result<IngestReport> {
    validation::validate_file_extension("input", &args.input, &["csv"])?;
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let path = args
        .store
        .clone()
        .or_else(|| config.storage.path.clone())
        .ok_or_else(|| saju_engine::SajuError::MissingConfig {
            field: "storage.path".to_string(),
        })?;
    validation::validate_path("storage.path", &path)?;

    let store = FileStore::open(&path).await?;
    let file = File::open(&args.input)?;
    tracing::info!("📁 Importing {} into {}", args.input, store.path().display());
    match args.kind {
        TableKind::SolarTerms => {
            ingest::import_solar_terms_csv(file, &store, config.ingest.meridian_correction).await
        }
        TableKind::LunarSolar => ingest::import_lunar_solar_csv(file, &store).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_cli_logger(true);
    } else {
        logger::init_json_logger();
    }

    match run(&args).await {
        Ok(report) => {
            println!(
                "✅ {} rows read, {} written, {} skipped",
                report.rows_read,
                report.written,
                report.skipped.len()
            );
            for (line, reason) in report.skipped.iter().take(20) {
                println!("  ⚠️ line {}: {}", line, reason);
            }
        }
        Err(e) => {
            tracing::error!("❌ Import failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }
    Ok(())
}
