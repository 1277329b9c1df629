use crate::domain::book::Book;
use crate::domain::ids::{BookId, PurchaseId, RentalId, ReviewId};
use crate::domain::ports::EntityStore;
use crate::domain::purchase::PurchaseRequest;
use crate::domain::query::{BookFilter, PurchaseFilter, RentalFilter, ReviewFilter};
use crate::domain::record::{ChangeSet, EntityKind, Record, Write};
use crate::domain::rental::RentalRequest;
use crate::domain::review::Review;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    rentals: BTreeMap<RentalId, RentalRequest>,
    purchases: BTreeMap<PurchaseId, PurchaseRequest>,
    reviews: BTreeMap<ReviewId, Review>,
    sequences: HashMap<EntityKind, u64>,
}

impl Tables {
    fn stored_version(&self, kind: EntityKind, id: u64) -> Option<u64> {
        match kind {
            EntityKind::Book => self.books.get(&BookId::new(id)).map(|b| b.version),
            EntityKind::Rental => self.rentals.get(&RentalId::new(id)).map(|r| r.version),
            EntityKind::Purchase => self.purchases.get(&PurchaseId::new(id)).map(|p| p.version),
            EntityKind::Review => self.reviews.get(&ReviewId::new(id)).map(|r| r.version),
        }
    }

    fn put(&mut self, record: Record) {
        match record {
            Record::Book(b) => {
                self.books.insert(b.id, b);
            }
            Record::Rental(r) => {
                self.rentals.insert(r.id, r);
            }
            Record::Purchase(p) => {
                self.purchases.insert(p.id, p);
            }
            Record::Review(r) => {
                self.reviews.insert(r.id, r);
            }
        }
    }
}

/// A thread-safe in-memory entity store.
///
/// All tables live behind one `tokio::sync::RwLock`, so a commit validates and
/// applies its whole change set under a single write guard. Ideal for tests and
/// single-process runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let tables = self.tables.read().await;
        Ok(tables.books.get(&id).cloned())
    }

    async fn get_rental(&self, id: RentalId) -> Result<Option<RentalRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.rentals.get(&id).cloned())
    }

    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.purchases.get(&id).cloned())
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.get(&id).cloned())
    }

    async fn query_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let tables = self.tables.read().await;
        Ok(tables
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn query_rentals(&self, filter: &RentalFilter) -> Result<Vec<RentalRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .rentals
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn query_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<PurchaseRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn next_id(&self, kind: EntityKind) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let next = tables.sequences.entry(kind).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;
        changes.validate(|kind, id| Ok(tables.stored_version(kind, id)))?;
        for write in changes.into_writes() {
            match write {
                Write::Insert(record) | Write::Update(record) => tables.put(record),
            }
        }
        Ok(())
    }
}
