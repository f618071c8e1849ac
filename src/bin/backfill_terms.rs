use clap::Parser;
use saju_engine::adapters::data_gov::DataGovClient;
use saju_engine::adapters::file_store::FileStore;
use saju_engine::utils::{logger, validation::Validate};
use saju_engine::{BackfillJob, EngineConfig};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "backfill-terms")]
#[command(about = "Collect solar-term tables from data.go.kr into the table file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "saju.toml")]
    config: String,

    #[arg(long)]
    from: i32,

    #[arg(long)]
    to: i32,

    /// Override backfill.concurrent_requests from config
    #[arg(long)]
    concurrency: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_cli_logger(true);
    } else {
        logger::init_json_logger();
    }

    let mut config = match EngineConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    if let Some(concurrency) = args.concurrency {
        config.backfill.concurrent_requests = concurrency;
    }
    config.provider.enabled = true;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(3);
    }
    if args.from > args.to {
        eprintln!("❌ --from {} is after --to {}", args.from, args.to);
        std::process::exit(1);
    }

    let Some(path) = config.storage.path.clone() else {
        eprintln!("❌ storage.path must be set so collected terms are kept");
        std::process::exit(3);
    };

    let store = Arc::new(FileStore::open(&path).await?);
    let client = Arc::new(DataGovClient::new(
        &config.provider.endpoint,
        &config.provider.service_key,
        config.provider_timeout(),
    )?);

    tracing::info!("🚀 Backfilling {}-{} into {}", args.from, args.to, path);
    let report = BackfillJob::new(client, store)
        .with_concurrency(config.backfill.concurrent_requests)
        .with_inter_batch_delay(config.inter_batch_delay())
        .with_timeout(config.provider_timeout())
        .run(args.from..=args.to)
        .await;

    println!("✅ {} years collected", report.succeeded.len());
    for (year, reason) in &report.failed {
        println!("❌ {}: {}", year, reason);
    }

    if !report.is_complete() {
        std::process::exit(2);
    }
    Ok(())
}
