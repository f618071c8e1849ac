use clap::Parser;
use saju_engine::core::relations::Classification;
use saju_engine::domain::model::{DaeunTable, SaeunEntry, WolunEntry};
use saju_engine::utils::error::ErrorSeverity;
use saju_engine::utils::{logger, validation::Validate};
use saju_engine::{Chart, CliConfig, SajuEngine, SajuError};
use serde::Serialize;

#[derive(Serialize)]
struct Report {
    chart: Chart,
    daeun: DaeunTable,
    saeun: Vec<SaeunEntry>,
    wolun: Vec<WolunEntry>,
    classification: Classification,
}

fn exit_with(e: &SajuError) -> ! {
    tracing::error!(
        "❌ Chart failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn build_report(cli: &CliConfig) -> Result<Report, SajuError> {
    let config = cli.engine_config()?;
    config.validate()?;

    let engine = SajuEngine::from_config(&config).await?;
    let input = cli.to_birth_input()?;
    let chart = engine.chart(&input).await?;
    let daeun = engine.daeun(&chart).await?;
    let saeun = engine.saeun(&chart, cli.saeun_offset, cli.saeun_years).collect();
    let wolun_year = cli.wolun_year.unwrap_or(chart.input.year);
    let wolun = engine.wolun(wolun_year, 12)?.collect();
    let classification = engine.classify(&chart);

    Ok(Report {
        chart,
        daeun,
        saeun,
        wolun,
        classification,
    })
}

fn print_report(report: &Report) {
    let p = &report.chart.pillars;
    let hour = p
        .hour
        .map(|h| format!("{} ({})", h.hanja(), h.hangul()))
        .unwrap_or_else(|| "unknown".to_string());

    println!("📅 Solar date: {}", report.chart.solar_date);
    if let Some(lunar) = report.chart.lunar_date {
        println!("🌙 Lunar date: {}", lunar);
    }
    println!("🏛️ Four Pillars:");
    println!("  Year:  {} ({})", p.year.hanja(), p.year.hangul());
    println!("  Month: {} ({})", p.month.hanja(), p.month.hangul());
    println!("  Day:   {} ({})", p.day.hanja(), p.day.hangul());
    println!("  Hour:  {}", hour);

    let tally: Vec<String> = report
        .chart
        .elements
        .tally
        .iter()
        .map(|(element, count)| format!("{}{}", element.hanja(), count))
        .collect();
    println!("  Elements: {}", tally.join(" "));

    let (a, b) = report.classification.void_pair;
    println!("  Void pair: {}{}", a.hanja(), b.hanja());
    if !report.classification.stars.is_empty() {
        let stars: Vec<&str> = report.classification.stars.iter().map(|s| s.star.hanja()).collect();
        println!("  Stars: {}", stars.join(", "));
    }

    println!();
    println!(
        "🔄 Daeun ({:?}, starts at {}, {} is {} days away):",
        report.daeun.direction,
        report.daeun.starting_number,
        report.daeun.boundary_term,
        report.daeun.days_to_boundary
    );
    for period in &report.daeun.periods {
        println!("  {:>3}-{:<3} {}", period.start_age, period.end_age, period.pillar.hanja());
    }

    println!();
    println!("📆 Saeun:");
    for entry in &report.saeun {
        println!("  {} (age {}) {}", entry.year, entry.age, entry.pillar.hanja());
    }

    println!();
    println!("🗓️ Wolun:");
    for entry in &report.wolun {
        println!("  #{:<2} {}", entry.month_ordinal, entry.pillar.hanja());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting saju CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Input validation failed: {}", e);
        exit_with(&e);
    }

    let report = match build_report(&cli).await {
        Ok(report) => report,
        Err(e) => exit_with(&e),
    };

    if report.chart.term_precision == saju_engine::domain::model::Precision::Interpolated {
        eprintln!("⚠️ Solar terms for this year are interpolated; month and daeun boundaries may be off by a day");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
