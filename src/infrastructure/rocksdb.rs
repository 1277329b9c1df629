use crate::domain::book::Book;
use crate::domain::ids::{BookId, PurchaseId, RentalId, ReviewId};
use crate::domain::ports::EntityStore;
use crate::domain::purchase::PurchaseRequest;
use crate::domain::query::{BookFilter, PurchaseFilter, RentalFilter, ReviewFilter};
use crate::domain::record::{ChangeSet, EntityKind, Record, Write};
use crate::domain::rental::RentalRequest;
use crate::domain::review::Review;
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing books.
pub const CF_BOOKS: &str = "books";
/// Column Family for storing rental requests.
pub const CF_RENTALS: &str = "rentals";
/// Column Family for storing purchase requests.
pub const CF_PURCHASES: &str = "purchases";
/// Column Family for storing reviews.
pub const CF_REVIEWS: &str = "reviews";
/// Column Family for id sequences, keyed by entity kind.
pub const CF_META: &str = "meta";

fn column_family(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Book => CF_BOOKS,
        EntityKind::Rental => CF_RENTALS,
        EntityKind::Purchase => CF_PURCHASES,
        EntityKind::Review => CF_REVIEWS,
    }
}

impl From<rocksdb::Error> for MarketError {
    fn from(err: rocksdb::Error) -> Self {
        MarketError::store(err)
    }
}

/// A persistent store implementation using RocksDB.
///
/// Each entity kind lives in its own Column Family, keyed by the big-endian
/// identifier, with JSON values. Commits validate versions and allocate ids
/// under one async mutex and write through a single `WriteBatch`, so a change
/// set lands atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that every required column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = EntityKind::ALL
            .iter()
            .map(|kind| column_family(*kind))
            .chain([CF_META])
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            MarketError::store(std::io::Error::other(format!(
                "{name} column family not found"
            )))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, kind: EntityKind, id: u64) -> Result<Option<T>> {
        let cf = self.handle(column_family(kind))?;
        match self.db.get_pinned_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T, F>(&self, kind: EntityKind, keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let cf = self.handle(column_family(kind))?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let entity: T = serde_json::from_slice(&value)?;
            if keep(&entity) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    fn stored_version(&self, kind: EntityKind, id: u64) -> Result<Option<u64>> {
        let version = match kind {
            EntityKind::Book => self.get_json::<Book>(kind, id)?.map(|b| b.version),
            EntityKind::Rental => self.get_json::<RentalRequest>(kind, id)?.map(|r| r.version),
            EntityKind::Purchase => self
                .get_json::<PurchaseRequest>(kind, id)?
                .map(|p| p.version),
            EntityKind::Review => self.get_json::<Review>(kind, id)?.map(|r| r.version),
        };
        Ok(version)
    }

    fn put_record(&self, batch: &mut WriteBatch, record: &Record) -> Result<()> {
        let cf = self.handle(column_family(record.kind()))?;
        let key = record.id().to_be_bytes();
        let value = match record {
            Record::Book(b) => to_json(b)?,
            Record::Rental(r) => to_json(r)?,
            Record::Purchase(p) => to_json(p)?,
            Record::Review(r) => to_json(r)?,
        };
        batch.put_cf(cf, key, value);
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

#[async_trait]
impl EntityStore for RocksDbStore {
    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        self.get_json(EntityKind::Book, id.value())
    }

    async fn get_rental(&self, id: RentalId) -> Result<Option<RentalRequest>> {
        self.get_json(EntityKind::Rental, id.value())
    }

    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseRequest>> {
        self.get_json(EntityKind::Purchase, id.value())
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        self.get_json(EntityKind::Review, id.value())
    }

    async fn query_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        self.scan(EntityKind::Book, |b| filter.matches(b))
    }

    async fn query_rentals(&self, filter: &RentalFilter) -> Result<Vec<RentalRequest>> {
        self.scan(EntityKind::Rental, |r| filter.matches(r))
    }

    async fn query_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<PurchaseRequest>> {
        self.scan(EntityKind::Purchase, |p| filter.matches(p))
    }

    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>> {
        self.scan(EntityKind::Review, |r| filter.matches(r))
    }

    async fn next_id(&self, kind: EntityKind) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let cf = self.handle(CF_META)?;
        let current = match self.db.get_pinned_cf(cf, kind.as_str())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    MarketError::store(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("corrupt {kind} sequence"),
                    ))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, kind.as_str(), next.to_be_bytes())?;
        Ok(next)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        changes.validate(|kind, id| self.stored_version(kind, id))?;

        let mut batch = WriteBatch::default();
        for write in changes.writes() {
            match write {
                Write::Insert(record) | Write::Update(record) => {
                    self.put_record(&mut batch, record)?;
                }
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::money::Pricing;
    use crate::domain::review::Stars;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn book(id: u64) -> Book {
        let pricing = Pricing::new(dec!(1.5), dec!(40)).unwrap();
        Book::new(BookId::new(id), UserId::new(7), "Persuasion", pricing, Utc::now())
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_BOOKS, CF_RENTALS, CF_PURCHASES, CF_REVIEWS, CF_META] {
            assert!(store.db.cf_handle(name).is_some(), "{name} missing");
        }
    }

    #[tokio::test]
    async fn test_rocksdb_book_round_trip_and_conflict() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let original = book(1);
        store.insert(original.clone().into()).await.unwrap();
        assert_eq!(store.get_book(BookId::new(1)).await.unwrap(), Some(original.clone()));

        let mut updated = original.clone();
        updated.rentable = false;
        updated.touch(Utc::now());
        store.update(updated.clone().into()).await.unwrap();

        // Writing over the old version again must fail.
        let mut stale = original;
        stale.touch(Utc::now());
        let result = store.update(stale.into()).await;
        assert!(matches!(result, Err(MarketError::ConflictRetry(_))));

        let stored = store.get_book(BookId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_rocksdb_review_lookup() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let review = Review::new(
            ReviewId::new(5),
            BookId::new(1),
            UserId::new(2),
            Stars::new(2).unwrap(),
            "Slow start",
            Utc::now(),
        );
        store.insert(review.clone().into()).await.unwrap();

        assert_eq!(store.get_review(ReviewId::new(5)).await.unwrap(), Some(review));
        assert!(store.get_review(ReviewId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_sequences_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            assert_eq!(store.next_id(EntityKind::Rental).await.unwrap(), 1);
            assert_eq!(store.next_id(EntityKind::Rental).await.unwrap(), 2);
        }
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert_eq!(store.next_id(EntityKind::Rental).await.unwrap(), 3);
        assert_eq!(store.next_id(EntityKind::Book).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_query_filters() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.insert(book(1).into()).await.unwrap();
        let mut closed = book(2);
        closed.rentable = false;
        closed.purchasable = false;
        store.insert(closed.into()).await.unwrap();

        let open = store.query_books(&BookFilter::fully_available()).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, BookId::new(1));
    }
}
