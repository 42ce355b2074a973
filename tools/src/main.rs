//! identity-runner: headless institution identity resolution.
//!
//! Usage:
//!   identity-runner --db silver.db --out ./output
//!   identity-runner --db silver.db --config analysis.json --crosswalk-only
//!   identity-runner --synthetic-seed 7 --institutions 200 --out ./demo
//!
//! Exit status is zero whenever the run completes, including runs that
//! report mapping errors. Schema, configuration and I/O failures are
//! non-zero.

use anyhow::{Context, Result};
use lender_identity_core::{
    config::{AnalysisConfig, OscillationMode},
    engine::{new_run_id, IdentityEngine},
    export::{export_crosswalk, export_report},
    report::AnalysisSummary,
    store::IdentityStore,
    synthetic::{write_synthetic, SyntheticParams},
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let out_dir = string_arg(&args, "--out").unwrap_or("./output");
    let crosswalk_only = args.iter().any(|a| a == "--crosswalk-only");
    let exhaustive = args.iter().any(|a| a == "--exhaustive");
    let json_summary = args.iter().any(|a| a == "--json");
    let synthetic_seed: Option<u64> = string_arg(&args, "--synthetic-seed").map(str::parse).transpose()?;
    let institutions = parse_arg(&args, "--institutions", 100usize);

    let mut config = match string_arg(&args, "--config") {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if exhaustive {
        config = config.with_oscillation_mode(OscillationMode::Exhaustive);
    }

    if !json_summary {
        println!("FHA institution identity resolution: identity-runner");
        println!("  db:        {db}");
        println!("  table:     {}", config.source.table);
        println!("  out:       {out_dir}");
        println!("  mode:      {:?}", config.oscillation_mode);
        println!();
    }

    let store = IdentityStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;

    if let Some(seed) = synthetic_seed {
        let rows = write_synthetic(&store, &config.source, &SyntheticParams::new(seed, institutions))?;
        log::info!("Synthetic dataset: seed {seed}, {institutions} institutions, {rows} rows");
    }

    let mut engine = IdentityEngine::build(new_run_id(), config.clone());
    let report = engine.run_with_store(&store)?;

    let out = Path::new(out_dir);
    if crosswalk_only {
        export_crosswalk(&report, &config, out)?;
    } else {
        export_report(&report, &config, out)?;
    }

    let summary = report.summary();
    if json_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &AnalysisSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:               {}", summary.run_id);
    println!("  institution numbers:  {}", summary.unique_institution_numbers);
    println!("  institution names:    {}", summary.unique_institution_names);
    println!("  crosswalk rows:       {}", summary.crosswalk_rows);
    println!("  events:               {}", summary.events);
    for (ty, n) in &summary.events_by_type {
        println!("    {ty:<28}{n}");
    }
    println!("  originator renamed:   {}", summary.originators_with_name_changes);
    println!("  sponsor renamed:      {}", summary.sponsors_with_name_changes);
    println!("  originator oscill.:   {}", summary.originator_oscillations);
    println!("  sponsor oscill.:      {}", summary.sponsor_oscillations);
    println!("  mapping errors:       {}", summary.mapping_errors);
    if summary.anomaly_count() > 0 {
        println!();
        println!("  {} data-quality findings; see the errors table.", summary.anomaly_count());
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
