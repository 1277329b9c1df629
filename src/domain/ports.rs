use super::book::Book;
use super::ids::{BookId, PurchaseId, RentalId, ReviewId};
use super::purchase::PurchaseRequest;
use super::query::{BookFilter, PurchaseFilter, RentalFilter, ReviewFilter};
use super::record::{ChangeSet, EntityKind, Record};
use super::rental::RentalRequest;
use super::review::Review;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable storage for books, requests and reviews.
///
/// Reads are plain lookups and filtered scans. Every write goes through
/// `commit`, which must apply the whole change set or none of it, and must
/// refuse any write whose version does not follow the stored one with
/// `MarketError::ConflictRetry`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;
    async fn get_rental(&self, id: RentalId) -> Result<Option<RentalRequest>>;
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseRequest>>;
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;

    async fn query_books(&self, filter: &BookFilter) -> Result<Vec<Book>>;
    async fn query_rentals(&self, filter: &RentalFilter) -> Result<Vec<RentalRequest>>;
    async fn query_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<PurchaseRequest>>;
    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>>;

    /// Allocates the next identifier for `kind`. Never reuses a value.
    async fn next_id(&self, kind: EntityKind) -> Result<u64>;

    async fn commit(&self, changes: ChangeSet) -> Result<()>;

    async fn insert(&self, record: Record) -> Result<()> {
        self.commit(ChangeSet::new().insert(record)).await
    }

    async fn update(&self, record: Record) -> Result<()> {
        self.commit(ChangeSet::new().update(record)).await
    }
}

pub type EntityStoreRef = Arc<dyn EntityStore>;
