mod catalog;
mod db;
mod error;
mod loader;
mod report;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

#[derive(Parser)]
#[command(
    name = "stocktake",
    about = "Store-stock ETL: load CSV relations/locations and an HTML catalog into SQLite, then report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store schema (safe to re-run)
    Init,
    /// Load the relations and locations CSV files
    Load {
        #[arg(long, default_value = "relations.csv")]
        relations: PathBuf,
        #[arg(long, default_value = "locations.csv")]
        locations: PathBuf,
        /// Commit each source in one transaction instead of per row
        #[arg(long)]
        batch: bool,
    },
    /// Extract products from the HTML catalog
    Extract {
        #[arg(long, default_value = "index.html")]
        catalog: PathBuf,
        /// Commit the whole catalog in one transaction instead of per row
        #[arg(long)]
        batch: bool,
    },
    /// Write the price-sorted stock report
    Report {
        #[arg(short, long, default_value = "report.csv")]
        output: PathBuf,
    },
    /// Full pipeline: init, load, extract, report
    Run {
        #[arg(long, default_value = "relations.csv")]
        relations: PathBuf,
        #[arg(long, default_value = "locations.csv")]
        locations: PathBuf,
        #[arg(long, default_value = "index.html")]
        catalog: PathBuf,
        #[arg(short, long, default_value = "report.csv")]
        output: PathBuf,
        /// Commit each source in one transaction instead of per row
        #[arg(long)]
        batch: bool,
    },
    /// Row counts per table
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let conn = db::connect()?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Init => {
            println!("Schema ready.");
            Ok(())
        }
        Commands::Load {
            relations,
            locations,
            batch,
        } => load_step(&conn, &relations, &locations, batch),
        Commands::Extract { catalog, batch } => extract_step(&conn, &catalog, batch),
        Commands::Report { output } => report_step(&conn, &output),
        Commands::Run {
            relations,
            locations,
            catalog,
            output,
            batch,
        } => {
            load_step(&conn, &relations, &locations, batch)?;
            extract_step(&conn, &catalog, batch)?;
            report_step(&conn, &output)
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Products:  {}", s.products);
            println!("Locations: {}", s.locations);
            println!("Relations: {}", s.relations);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn load_step(
    conn: &Connection,
    relations: &Path,
    locations: &Path,
    batch: bool,
) -> anyhow::Result<()> {
    let file = open(relations)?;
    let n_rel = db::with_commit_mode(conn, batch, |c| loader::load_relations(c, file))?;
    println!("Loaded {} relations from {}", n_rel, relations.display());

    let file = open(locations)?;
    let n_loc = db::with_commit_mode(conn, batch, |c| loader::load_locations(c, file))?;
    println!("Loaded {} locations from {}", n_loc, locations.display());
    Ok(())
}

fn extract_step(conn: &Connection, catalog: &Path, batch: bool) -> anyhow::Result<()> {
    let file = open(catalog)?;
    let n = db::with_commit_mode(conn, batch, |c| catalog::load_catalog(c, file))?;
    println!("Extracted {} products from {}", n, catalog.display());
    Ok(())
}

fn report_step(conn: &Connection, output: &Path) -> anyhow::Result<()> {
    let n = report::write_report(conn, output)?;
    println!("Wrote {} report rows to {}", n, output.display());
    Ok(())
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    fn fixture(name: &str) -> File {
        File::open(format!("tests/fixtures/{name}")).unwrap()
    }

    #[test]
    fn full_pipeline_from_fixtures() {
        let conn = memory_db();
        let n_rel = loader::load_relations(&conn, fixture("relations.csv")).unwrap();
        let n_loc = loader::load_locations(&conn, fixture("locations.csv")).unwrap();
        let n_prod = catalog::load_catalog(&conn, fixture("catalog.html")).unwrap();
        assert_eq!((n_rel, n_loc, n_prod), (4, 3, 3));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.csv");
        let n_rows = report::write_report(&conn, &out).unwrap();
        assert_eq!(n_rows, 4);

        let text = std::fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("description,price,currency,stock,location")
        );
        assert_eq!(lines.clone().count(), 4);

        // Every relation resolves, cheapest product first.
        let prices: Vec<f64> = lines
            .map(|l| l.split(',').nth(1).unwrap().parse().unwrap())
            .collect();
        assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn batched_pipeline_matches_per_row_commits() {
        let conn = memory_db();
        let n = db::with_commit_mode(&conn, true, |c| {
            loader::load_relations(c, fixture("relations.csv"))
        })
        .unwrap();
        assert_eq!(n, 4);
        assert_eq!(db::get_stats(&conn).unwrap().relations, 4);
    }
}
