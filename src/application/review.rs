use super::catalog::Catalog;
use crate::domain::book::{Book, RatingAggregate};
use crate::domain::ids::{BookId, ReviewId, UserId};
use crate::domain::ports::EntityStoreRef;
use crate::domain::query::ReviewFilter;
use crate::domain::record::{ChangeSet, EntityKind};
use crate::domain::review::{Review, Stars};
use crate::error::{MarketError, Result};
use chrono::Utc;
use tracing::info;

/// Appends reviews and keeps each book's rating aggregate in step.
#[derive(Clone)]
pub struct ReviewAggregator {
    store: EntityStoreRef,
    catalog: Catalog,
}

impl ReviewAggregator {
    pub fn new(store: EntityStoreRef) -> Self {
        let catalog = Catalog::new(store.clone());
        Self { store, catalog }
    }

    /// Inserts the review and rewrites the book's aggregate, recomputed from
    /// every rating on record, in one commit.
    pub async fn add_review(
        &self,
        reviewer: UserId,
        book_id: BookId,
        rating: Stars,
        body: &str,
    ) -> Result<(Review, Book)> {
        let mut book = self.catalog.get_book(book_id).await?;
        let existing = self.reviews_for_book(book_id).await?;

        let now = Utc::now();
        let id = ReviewId::new(self.store.next_id(EntityKind::Review).await?);
        let review = Review::new(id, book_id, reviewer, rating, body, now);

        book.rating = RatingAggregate::from_ratings(
            existing
                .iter()
                .map(|r| r.rating.value())
                .chain([rating.value()]),
        );
        book.touch(now);

        let changes = ChangeSet::new().insert(review.clone()).update(book.clone());
        self.store.commit(changes).await?;

        info!(
            book = %book_id,
            actor = %reviewer,
            review = %id,
            rating = %book.rating.mean,
            "Review added"
        );
        Ok((review, book))
    }

    pub async fn get_review(&self, id: ReviewId) -> Result<Review> {
        self.store
            .get_review(id)
            .await?
            .ok_or_else(|| MarketError::not_found(EntityKind::Review, id))
    }

    pub async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>> {
        self.store.query_reviews(&ReviewFilter::for_book(book)).await
    }

    pub async fn reviews_by(&self, reviewer: UserId) -> Result<Vec<Review>> {
        self.store
            .query_reviews(&ReviewFilter::by_reviewer(reviewer))
            .await
    }
}
