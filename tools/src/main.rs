//! report-runner: batch entry points for the attenuation tracker.
//!
//! Usage:
//!   report-runner init   --db track.db
//!   report-runner ingest --db track.db --file report.xlsx [--date 2024-02-05] [--config cfg.json]
//!   report-runner diff   --db track.db --date 2024-02-05 [--prev 2024-02-04] [--config cfg.json]
//!   report-runner export --db track.db --from 2024-02-01 --to 2024-02-29 --out trend.xlsx
//!   report-runner stats  --db track.db

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fibertrack_core::{
    config::TrackerConfig,
    diff::DiffEngine,
    export::write_trend_export,
    ingest::ingest_report,
    store::ReportStore,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        bail!("missing command");
    };

    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config = match flag_value(&args, "--config") {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };

    match command.as_str() {
        "init" => {
            let store = ReportStore::open(db)?;
            store.migrate()?;
            println!("schema ready: {db}");
        }
        "ingest" => {
            let file = flag_value(&args, "--file").context("ingest requires --file")?;
            let date = parse_date_flag(&args, "--date")?;
            let store = ReportStore::open(db)?;
            store.migrate()?;
            let (report_date, written) =
                ingest_report(&store, &config, Path::new(file), date)?;
            println!("ingested {written} rows for {report_date}");
        }
        "diff" => {
            let date = parse_date_flag(&args, "--date")?
                .context("diff requires --date YYYY-MM-DD")?;
            let prev = parse_date_flag(&args, "--prev")?;
            let store = ReportStore::open(db)?;
            store.migrate()?;
            let outcome = DiffEngine::new(&store, config).run_for_date(date, prev)?;
            println!(
                "{date}: {} new, {} ended, {} persisting ({} skipped)",
                outcome.new, outcome.ended, outcome.persisting, outcome.skipped
            );
        }
        "export" => {
            let from = parse_date_flag(&args, "--from")?
                .context("export requires --from YYYY-MM-DD")?;
            let to = parse_date_flag(&args, "--to")?
                .context("export requires --to YYYY-MM-DD")?;
            let out = flag_value(&args, "--out").context("export requires --out")?;
            let store = ReportStore::open(db)?;
            store.migrate()?;
            write_trend_export(&store, from, to, Path::new(out))?;
            println!("export written: {out}");
        }
        "stats" => {
            let store = ReportStore::open(db)?;
            store.migrate()?;
            print_stats(&store)?;
        }
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

fn print_stats(store: &ReportStore) -> Result<()> {
    let stats = store.stats()?;
    println!("=== STORE SUMMARY ===");
    println!("  snapshot days:   {}", stats.snapshot_days);
    println!("  snapshot rows:   {}", stats.snapshot_rows);
    match (stats.first_date, stats.last_date) {
        (Some(first), Some(last)) => println!("  date range:      {first} .. {last}"),
        _ => println!("  date range:      (empty)"),
    }
    println!("  tracked:         {}", stats.tracked_subscribers);
    println!("  active:          {}", stats.active_subscribers);
    println!("  ended:           {}", stats.ended_subscribers);
    println!("  max consecutive: {} days", stats.max_consecutive_days);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_date_flag(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    match flag_value(args, flag) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map(Some)
            .with_context(|| format!("{flag} must be YYYY-MM-DD, got {raw:?}")),
    }
}

fn print_usage() {
    eprintln!("usage: report-runner <init|ingest|diff|export|stats> [flags]");
    eprintln!("  init   --db FILE");
    eprintln!("  ingest --db FILE --file REPORT.xlsx [--date YYYY-MM-DD] [--config FILE]");
    eprintln!("  diff   --db FILE --date YYYY-MM-DD [--prev YYYY-MM-DD] [--config FILE]");
    eprintln!("  export --db FILE --from YYYY-MM-DD --to YYYY-MM-DD --out FILE.xlsx");
    eprintln!("  stats  --db FILE");
}
