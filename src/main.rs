//! Interactive console client for the journey planner.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use routech::analysis;
use routech::feed::FeedStore;
use routech::format;
use routech::planner::{Planner, PlannerConfig, QueryError};

/// Compute public-transit journeys from a local GTFS feed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the GTFS feed files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Minimum transfer time between different trips, in seconds
    #[arg(long, default_value_t = 0)]
    min_transfer_secs: u32,

    /// Maximum number of journeys per query
    #[arg(long, default_value_t = 5)]
    max_routes: usize,

    /// Print feed analytics after loading
    #[arg(long)]
    analytics: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    println!("Loading GTFS feed from {}...", args.data_dir.display());
    let feed = FeedStore::load(&args.data_dir)
        .with_context(|| format!("loading GTFS feed from {}", args.data_dir.display()))?;
    println!(
        "Feed loaded: {} stops, {} trips.",
        feed.stop_count(),
        feed.trip_count()
    );

    if args.analytics {
        print_analytics(&feed);
    }

    let config = PlannerConfig::default()
        .with_max_results(args.max_routes)
        .with_min_transfer_secs(args.min_transfer_secs);
    let planner = Planner::new(&feed, config);

    prompt_loop(&planner)
}

/// Prompts for queries until the user declines to continue or input ends.
fn prompt_loop(planner: &Planner) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(start) = prompt(&mut lines, "From", None)? else {
            break;
        };
        let Some(end) = prompt(&mut lines, "To", None)? else {
            break;
        };

        let today = Local::now().format("%Y-%m-%d").to_string();
        let Some(date) = prompt(&mut lines, "Date", Some(&today))? else {
            break;
        };
        let now = Local::now().format("%H:%M").to_string();
        let Some(time) = prompt(&mut lines, "Departure", Some(&now))? else {
            break;
        };

        match planner.find_route(&start, &end, &date, &time) {
            Ok(journeys) => {
                println!("{}", format::format_journeys(&journeys, &start, &end));
            }
            Err(QueryError::AmbiguousStation { query, candidates }) => {
                println!("\"{query}\" matches more than one station:");
                for candidate in candidates {
                    println!("  - {candidate}");
                }
                println!("Please repeat the query with one of these names.");
            }
            Err(err @ (QueryError::BadDate(_) | QueryError::BadTime(_))) => {
                println!("{err}");
            }
            Err(QueryError::StationNotFound(name)) => {
                println!("No station matches \"{name}\".");
            }
            Err(err @ QueryError::Cancelled) => {
                println!("{err}");
            }
        }

        let Some(again) = prompt(&mut lines, "Plan another journey? [Y/n]", Some("y"))? else {
            break;
        };
        if again.eq_ignore_ascii_case("n") || again.eq_ignore_ascii_case("no") {
            break;
        }
        println!();
    }

    Ok(())
}

/// Reads one answer, applying a default for empty input.
///
/// Returns `None` once stdin is exhausted.
fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
    default: Option<&str>,
) -> anyhow::Result<Option<String>> {
    match default {
        Some(default) => print!("{label} [{default}]: "),
        None => print!("{label}: "),
    }
    io::stdout().flush().context("flushing prompt")?;

    let Some(line) = lines.next() else {
        return Ok(None);
    };
    let line = line.context("reading input")?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.map(str::to_string))
    } else {
        Ok(Some(answer.to_string()))
    }
}

fn print_analytics(feed: &FeedStore) {
    println!("\nBusiest stops:");
    for entry in analysis::busiest_stops(feed, 10) {
        println!("  {:>8} calls  {}", entry.calls, entry.name);
    }

    println!("\nFastest end-to-end trip per departure hour:");
    for entry in analysis::fastest_direct_per_hour(feed) {
        println!(
            "  {:02}:00  {:>4} min  {}",
            entry.hour,
            entry.duration_secs / 60,
            entry.route_name
        );
    }

    println!("\nHops running past midnight (first 10):");
    for hop in analysis::overnight_hops(feed, 10) {
        println!(
            "  {} {} -> {} ({} -> {})",
            hop.trip_id, hop.from_name, hop.to_name, hop.departure, hop.arrival
        );
    }
    println!();
}
