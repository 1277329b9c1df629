use bookswap::application::marketplace::Marketplace;
use bookswap::application::retry::RetryPolicy;
use bookswap::config::{DEFAULT_RENTAL_DAYS, MarketConfig};
use bookswap::domain::ports::EntityStoreRef;
use bookswap::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use bookswap::infrastructure::rocksdb::RocksDbStore;
use bookswap::interfaces::csv::command_reader::CommandReader;
use bookswap::interfaces::csv::report_writer::ReportWriter;
use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Report {
    Books,
    Rentals,
    Purchases,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command log CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Which table to print once every command has been applied
    #[arg(long, value_enum, default_value_t = Report::Books)]
    report: Report,

    /// Rental length used when a request_rental row leaves `days` empty
    #[arg(long, default_value_t = DEFAULT_RENTAL_DAYS)]
    rental_days: u32,

    /// How often a command that lost a concurrent update is replayed
    #[arg(long, default_value_t = 3)]
    max_retries: usize,
}

fn open_store(db_path: Option<PathBuf>) -> Result<EntityStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryStore::new()))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = MarketConfig::default()
        .with_default_rental_days(cli.rental_days)
        .with_retry(RetryPolicy::default().with_max_retries(cli.max_retries));
    let market = Marketplace::new(open_store(cli.db_path)?, config);

    // Replay commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                let name = command.name();
                let actor = command.actor();
                if let Err(e) = market.execute(command).await {
                    tracing::warn!(row = row + 1, command = name, actor = %actor, error = %e, "Error processing command");
                }
            }
            Err(e) => {
                tracing::warn!(row = row + 1, error = %e, "Error reading command");
            }
        }
    }

    // Output final state
    let stdout = io::stdout();
    match cli.report {
        Report::Books => {
            let books = market.all_books().await.into_diagnostic()?;
            let mut rows = Vec::with_capacity(books.len());
            for book in &books {
                rows.push((book, market.book_state(book.id).await.into_diagnostic()?));
            }
            ReportWriter::new(stdout.lock())
                .write_books(rows)
                .into_diagnostic()?;
        }
        Report::Rentals => {
            let rentals = market.all_rentals().await.into_diagnostic()?;
            ReportWriter::new(stdout.lock())
                .write_rentals(&rentals)
                .into_diagnostic()?;
        }
        Report::Purchases => {
            let purchases = market.all_purchases().await.into_diagnostic()?;
            ReportWriter::new(stdout.lock())
                .write_purchases(&purchases)
                .into_diagnostic()?;
        }
    }

    Ok(())
}
