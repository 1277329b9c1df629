#![allow(dead_code)]

use bookswap::application::marketplace::Marketplace;
use bookswap::application::retry::RetryPolicy;
use bookswap::config::MarketConfig;
use bookswap::domain::availability::BookLedger;
use bookswap::domain::book::Book;
use bookswap::domain::ids::{BookId, UserId};
use bookswap::domain::money::Pricing;
use bookswap::domain::ports::EntityStoreRef;
use bookswap::domain::query::{PurchaseFilter, RentalFilter};
use bookswap::infrastructure::in_memory::InMemoryStore;
use rand::Rng;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const HEADER: [&str; 9] = [
    "type",
    "actor",
    "book",
    "request",
    "days",
    "price_per_day",
    "price",
    "rating",
    "text",
];

/// A marketplace over a fresh in-memory store, plus a handle on that store.
pub fn market() -> (Marketplace, EntityStoreRef) {
    market_with(MarketConfig::default())
}

pub fn market_with(config: MarketConfig) -> (Marketplace, EntityStoreRef) {
    let store: EntityStoreRef = Arc::new(InMemoryStore::new());
    (Marketplace::new(store.clone(), config), store)
}

/// Retries fast enough for tests that race many writers.
pub fn eager_retry(max_retries: usize) -> MarketConfig {
    MarketConfig::default().with_retry(
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4)),
    )
}

pub fn pricing(per_day: Decimal, price: Decimal) -> Pricing {
    Pricing::new(per_day, price).unwrap()
}

pub async fn list(market: &Marketplace, owner: u64, title: &str, pricing: Pricing) -> Book {
    market
        .list_book(UserId::new(owner), title, pricing)
        .await
        .unwrap()
}

pub async fn ledger(store: &EntityStoreRef, book: BookId) -> BookLedger {
    let book = store.get_book(book).await.unwrap().unwrap();
    let rentals = store
        .query_rentals(&RentalFilter::for_book(book.id))
        .await
        .unwrap();
    let purchases = store
        .query_purchases(&PurchaseFilter::for_book(book.id))
        .await
        .unwrap();
    BookLedger::new(book, rentals, purchases)
}

/// Writes a small, valid command log: one book per owner, then `rows`
/// rental requests from rotating renters.
pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    wtr.write_record(["list_book", "1", "", "", "", "1.5", "20", "", "Emma"])?;

    for i in 1..=rows {
        let renter = (i % 50 + 2).to_string();
        wtr.write_record(["request_rental", &renter, "1", "", "3", "", "", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a random command log of `rows` commands over a handful of books.
///
/// Most commands fail their checks; the log exercises every command type and
/// the error paths of the driver.
pub fn generate_random_csv(path: &Path, rows: usize) -> Result<(), Error> {
    const BOOKS: u64 = 20;
    const USERS: u64 = 50;

    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(HEADER)?;
    for book in 1..=BOOKS {
        let owner = (book % 10 + 1).to_string();
        let per_day = format!("{}.{}", rng.gen_range(1..20), rng.gen_range(0..100));
        let price = rng.gen_range(10..200).to_string();
        let title = format!("Book {book}");
        wtr.write_record(["list_book", &owner, "", "", "", &per_day, &price, "", &title])?;
    }

    let mut rentals = 0u64;
    let mut purchases = 0u64;
    for _ in 0..rows {
        let actor = rng.gen_range(1..=USERS).to_string();
        let book = rng.gen_range(1..=BOOKS).to_string();
        let owner = (rng.gen_range(1..=BOOKS) % 10 + 1).to_string();
        match rng.gen_range(0..8) {
            0 | 1 => {
                rentals += 1;
                let days = rng.gen_range(1..30).to_string();
                wtr.write_record(["request_rental", &actor, &book, "", &days, "", "", "", ""])?;
            }
            2 => {
                purchases += 1;
                wtr.write_record(["request_purchase", &actor, &book, "", "", "", "", "", ""])?;
            }
            3 if rentals > 0 => {
                let id = rng.gen_range(1..=rentals).to_string();
                wtr.write_record(["approve_rental", &owner, "", &id, "", "", "", "", ""])?;
            }
            4 if rentals > 0 => {
                let id = rng.gen_range(1..=rentals).to_string();
                wtr.write_record(["return_book", &actor, "", &id, "", "", "", "", ""])?;
            }
            5 if purchases > 0 => {
                let id = rng.gen_range(1..=purchases).to_string();
                wtr.write_record(["approve_purchase", &owner, "", &id, "", "", "", "", ""])?;
            }
            6 if purchases > 0 => {
                let id = rng.gen_range(1..=purchases).to_string();
                wtr.write_record(["reject_purchase", &owner, "", &id, "", "", "", "", ""])?;
            }
            _ => {
                let rating = rng.gen_range(1..=5).to_string();
                wtr.write_record(["review", &actor, &book, "", "", "", "", &rating, "ok"])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
