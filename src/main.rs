use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod aggregate;
mod chart;
mod db;
mod engine;
mod error;
mod models;
mod period;
mod report;
mod risk;

use models::RecordSet;
use period::PeriodSpec;

#[derive(Parser)]
#[command(name = "threat-reports")]
#[command(about = "Threat record aggregation and audience report generator for TITAN", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("window")
        .args(["days", "month", "quarter"])
        .multiple(false)
))]
struct PeriodArgs {
    /// Trailing window in days (30, 60 or 90)
    #[arg(long)]
    days: Option<i64>,
    /// Calendar month 1-12, combined with --year
    #[arg(long)]
    month: Option<u32>,
    /// Calendar quarter 1-4, combined with --year
    #[arg(long)]
    quarter: Option<u32>,
    /// Calendar year; on its own selects the whole year
    #[arg(long)]
    year: Option<i32>,
}

impl PeriodArgs {
    fn to_spec(&self, today: NaiveDate) -> PeriodSpec {
        if let Some(month) = self.month {
            PeriodSpec::Month {
                month,
                year: self.year.unwrap_or_else(|| today.year()),
            }
        } else if let Some(quarter) = self.quarter {
            PeriodSpec::Quarter {
                quarter,
                year: self.year.unwrap_or_else(|| today.year()),
            }
        } else if let Some(year) = self.year {
            PeriodSpec::Year { year }
        } else {
            PeriodSpec::FixedDays {
                days: self.days.unwrap_or(30),
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import malware records from a CSV file
    ImportMalware {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import phishing records from a CSV file
    ImportPhishing {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export all stored records as JSON
    Export {
        #[arg(long, default_value = "export.json")]
        out: PathBuf,
    },
    /// Print aggregate statistics for a period
    Stats {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Generate an audience report document
    Report {
        /// Audience key: exec, it or users
        #[arg(long)]
        audience: String,
        #[command(flatten)]
        period: PeriodArgs,
        /// Output path; defaults to the suggested filename
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportMalware { csv } => {
            let (imported, skipped) = db::import_malware_csv(&pool, &csv).await?;
            println!(
                "Imported {imported} malware records from {} ({skipped} skipped).",
                csv.display()
            );
        }
        Commands::ImportPhishing { csv } => {
            let (imported, skipped) = db::import_phishing_csv(&pool, &csv).await?;
            println!(
                "Imported {imported} phishing records from {} ({skipped} skipped).",
                csv.display()
            );
        }
        Commands::Export { out } => {
            let json = db::export_json(&pool).await?;
            std::fs::write(&out, json)?;
            println!("Export written to {}.", out.display());
        }
        Commands::Stats { period } => {
            let today = Utc::now().date_naive();
            let spec = period.to_spec(today);
            let window = period::resolve(&spec, today)?;
            let records = fetch_window(&pool, window.start).await?;
            let agg = aggregate::aggregate(&records, &window);
            let posture = risk::assess(&records.events, &window);

            println!("Period: {}", window.label);
            println!(
                "Events: {} ({} open, {} resolved, {} critical/high)",
                agg.total_events,
                agg.open_events(),
                agg.resolved_events(),
                agg.critical_high_events()
            );
            println!(
                "Malware: {}  Phishing: {}",
                agg.total_malware, agg.total_phishing
            );
            println!(
                "Risk posture: {} (score {}, {} active events)",
                posture.level, posture.score, posture.active_events
            );

            if agg.top_families.is_empty() && agg.top_actor_groups.is_empty() {
                println!("No ranked threats in this window.");
            } else {
                println!("Top malware families:");
                for entry in &agg.top_families {
                    println!("- {} ({})", entry.label, entry.count);
                }
                println!("Top threat actor groups:");
                for entry in &agg.top_actor_groups {
                    println!("- {} ({})", entry.label, entry.count);
                }
            }
        }
        Commands::Report {
            audience,
            period,
            out,
        } => {
            let today = Utc::now().date_naive();
            let spec = period.to_spec(today);
            let window = period::resolve(&spec, today)?;
            let records = fetch_window(&pool, window.start).await?;
            let document = engine::generate(&audience, &spec, today, &records)?;

            let out = out.unwrap_or_else(|| PathBuf::from(&document.filename));
            std::fs::write(&out, &document.html)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// The three record fetches have no ordering dependency; issue them
/// concurrently and join before aggregation.
async fn fetch_window(pool: &sqlx::PgPool, start: NaiveDate) -> anyhow::Result<RecordSet> {
    let (events, malware, phishing) = tokio::try_join!(
        db::fetch_events(pool, Some(start)),
        db::fetch_malware(pool, Some(start)),
        db::fetch_phishing(pool, Some(start)),
    )?;
    Ok(RecordSet {
        events,
        malware,
        phishing,
    })
}
