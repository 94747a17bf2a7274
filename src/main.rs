//! CLI entry point for the combat simulator

use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use rift_sim::{
    config::{ItemLibrary, ScenarioConfig},
    engine::{SimReport, TimeEngine},
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "rift-sim")]
#[command(version = "1.0")]
#[command(about = "Deterministic single-target DPS simulator", long_about = None)]
struct Args {
    /// Path to the scenario file (YAML or JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Path to the item library file
    #[arg(short, long, default_value = "data/items.yaml")]
    items: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Compare the scenario's alternative builds and rank them by DPS
    #[arg(short, long, default_value = "false")]
    compare: bool,

    /// Print the full damage event log
    #[arg(short, long, default_value = "false")]
    log: bool,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let scenario = match ScenarioConfig::from_file(&args.scenario) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading scenario: {}", e);
            std::process::exit(1);
        }
    };
    let library = match ItemLibrary::from_file(&args.items) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error loading item library: {}", e);
            std::process::exit(1);
        }
    };

    if args.compare && !scenario.builds.is_empty() {
        compare_builds(&scenario, &library, &args);
        return;
    }

    let start = Instant::now();
    let report = match run_scenario(&scenario, &library, &scenario.items) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    match args.output {
        OutputFormat::Text => print_text(&scenario, &report, args.log),
        OutputFormat::Json => print_json(&scenario, &report),
    }

    if args.timing {
        println!("\nSimulated in {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    }
}

fn run_scenario(
    scenario: &ScenarioConfig,
    library: &ItemLibrary,
    item_names: &[String],
) -> Result<SimReport, rift_sim::ScenarioError> {
    let attacker = scenario.champion.at_level();
    let target = scenario.target.to_snapshot();
    let items = library.resolve_loadout(item_names);
    let abilities = scenario.to_abilities()?;

    let report = TimeEngine::new(attacker, target, items, abilities, scenario.duration)
        .with_time_step(scenario.time_step)
        .run();
    Ok(report)
}

fn compare_builds(scenario: &ScenarioConfig, library: &ItemLibrary, args: &Args) {
    let start = Instant::now();
    let mut ranked: Vec<(String, u32, SimReport)> = scenario
        .builds
        .par_iter()
        .filter_map(|build| match run_scenario(scenario, library, &build.items) {
            Ok(report) => Some((build.name.clone(), library.loadout_cost(&build.items), report)),
            Err(e) => {
                eprintln!("Skipping build '{}': {}", build.name, e);
                None
            }
        })
        .collect();
    let elapsed = start.elapsed();

    ranked.sort_by(|a, b| {
        b.2.dps()
            .partial_cmp(&a.2.dps())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    match args.output {
        OutputFormat::Text => {
            println!("============================================================");
            println!("BUILD COMPARISON: {}", scenario.name);
            println!("============================================================");
            println!(
                "{:<6}{:<28}{:>10}{:>12}{:>8}",
                "RANK", "BUILD", "DPS", "TOTAL", "COST"
            );
            for (rank, (name, cost, report)) in ranked.iter().enumerate() {
                println!(
                    "{:<6}{:<28}{:>10.1}{:>12.1}{:>8}",
                    rank + 1,
                    name,
                    report.dps(),
                    report.total_damage,
                    cost
                );
            }
        }
        OutputFormat::Json => {
            let builds: Vec<_> = ranked
                .iter()
                .map(|(name, cost, report)| {
                    serde_json::json!({
                        "name": name,
                        "cost": cost,
                        "dps": report.dps(),
                        "total_damage": report.total_damage,
                    })
                })
                .collect();
            let out = serde_json::json!({
                "scenario": scenario.name,
                "builds": builds,
            });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
    }

    if args.timing {
        println!(
            "\nCompared {} builds in {:.3}ms",
            ranked.len(),
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

fn print_text(scenario: &ScenarioConfig, report: &SimReport, show_log: bool) {
    println!("============================================================");
    println!("SCENARIO: {}", scenario.name);
    println!("============================================================");
    println!("Duration:       {:.1}s", report.duration);
    println!("Total damage:   {:.1}", report.total_damage);
    println!("DPS:            {:.1}", report.dps());
    println!("Events:         {}", report.events.len());
    println!("Mana remaining: {:.1}", report.mana_remaining);
    println!("Target health:  {:.1}", report.target_health);

    if show_log {
        println!();
        println!(
            "{:<10}{:<20}{:<10}{:>12}{:>12}",
            "TIME", "SOURCE", "TYPE", "RAW", "DEALT"
        );
        for record in &report.events {
            println!(
                "{:<10.3}{:<20}{:<10}{:>12.1}{:>12.1}",
                record.timestamp,
                record.source,
                format!("{:?}", record.damage_type).to_lowercase(),
                record.pre_mitigation,
                record.post_mitigation
            );
        }
    }
}

fn print_json(scenario: &ScenarioConfig, report: &SimReport) {
    let out = serde_json::json!({
        "scenario": scenario.name,
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
}
