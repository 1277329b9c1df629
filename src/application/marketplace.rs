use super::BookRequests;
use super::catalog::Catalog;
use super::command::{Command, Outcome};
use super::purchase::PurchaseWorkflow;
use super::rental::RentalWorkflow;
use super::retry::{RetryPolicy, retry_on_conflict};
use super::review::ReviewAggregator;
use crate::config::MarketConfig;
use crate::domain::availability::BookState;
use crate::domain::book::Book;
use crate::domain::ids::{BookId, PurchaseId, RentalId, ReviewId, UserId};
use crate::domain::money::Pricing;
use crate::domain::ports::EntityStoreRef;
use crate::domain::purchase::PurchaseRequest;
use crate::domain::query::{PurchaseFilter, RentalFilter};
use crate::domain::rental::{RentalPeriod, RentalRequest};
use crate::domain::review::{Review, Stars};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// The main entry point for callers of the marketplace.
///
/// `Marketplace` owns one store handle shared by every workflow. Mutating
/// calls are replayed under the configured `RetryPolicy` when they lose an
/// optimistic-concurrency race; every replay re-reads the book and its
/// requests, so a retried approval sees the winner's effects and fails with a
/// domain error instead of double-booking.
#[derive(Clone)]
pub struct Marketplace {
    store: EntityStoreRef,
    catalog: Catalog,
    rentals: RentalWorkflow,
    purchases: PurchaseWorkflow,
    reviews: ReviewAggregator,
    retry: RetryPolicy,
}

impl Marketplace {
    pub fn new(store: EntityStoreRef, config: MarketConfig) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            rentals: RentalWorkflow::new(store.clone(), config.default_rental_days),
            purchases: PurchaseWorkflow::new(store.clone()),
            reviews: ReviewAggregator::new(store.clone()),
            retry: config.retry,
            store,
        }
    }

    /// Runs one command through the matching workflow.
    pub async fn execute(&self, command: Command) -> Result<Outcome> {
        match command {
            Command::ListBook {
                owner,
                title,
                pricing,
            } => self.list_book(owner, &title, pricing).await.map(Outcome::Book),
            Command::UpdatePrice {
                actor,
                book,
                pricing,
            } => self
                .update_pricing(actor, book, pricing)
                .await
                .map(Outcome::Book),
            Command::RequestRental { actor, book, days } => self
                .request_rental(actor, book, days)
                .await
                .map(Outcome::Rental),
            Command::ApproveRental { actor, rental } => self
                .approve_rental(actor, rental)
                .await
                .map(Outcome::Rental),
            Command::RejectRental { actor, rental } => self
                .reject_rental(actor, rental)
                .await
                .map(Outcome::Rental),
            Command::ReturnBook { actor, rental } => {
                self.return_book(actor, rental).await.map(Outcome::Rental)
            }
            Command::RequestPurchase { actor, book } => self
                .request_purchase(actor, book)
                .await
                .map(Outcome::Purchase),
            Command::ApprovePurchase { actor, purchase } => self
                .approve_purchase(actor, purchase)
                .await
                .map(Outcome::Purchase),
            Command::RejectPurchase { actor, purchase } => self
                .reject_purchase(actor, purchase)
                .await
                .map(Outcome::Purchase),
            Command::Review {
                actor,
                book,
                rating,
                body,
            } => self
                .add_review(actor, book, rating, &body)
                .await
                .map(|(review, _)| Outcome::Review(review)),
        }
    }

    // Catalog

    pub async fn list_book(&self, owner: UserId, title: &str, pricing: Pricing) -> Result<Book> {
        retry_on_conflict(&self.retry, || self.catalog.list_book(owner, title, pricing)).await
    }

    pub async fn update_pricing(&self, actor: UserId, book: BookId, pricing: Pricing) -> Result<Book> {
        retry_on_conflict(&self.retry, || {
            self.catalog.update_pricing(actor, book, pricing)
        })
        .await
    }

    pub async fn get_book(&self, book: BookId) -> Result<Book> {
        self.catalog.get_book(book).await
    }

    pub async fn my_books(&self, owner: UserId) -> Result<Vec<Book>> {
        self.catalog.my_books(owner).await
    }

    pub async fn available_books(&self, viewer: UserId) -> Result<Vec<Book>> {
        self.catalog.available_books(viewer).await
    }

    pub async fn all_books(&self) -> Result<Vec<Book>> {
        self.catalog.all_books().await
    }

    pub async fn book_state(&self, book: BookId) -> Result<BookState> {
        self.catalog.book_state(book).await
    }

    // Rentals

    pub async fn request_rental(
        &self,
        actor: UserId,
        book: BookId,
        days: Option<u32>,
    ) -> Result<RentalRequest> {
        retry_on_conflict(&self.retry, || {
            self.rentals.request_rental(actor, book, days)
        })
        .await
    }

    pub async fn request_rental_for_period(
        &self,
        actor: UserId,
        book: BookId,
        period: RentalPeriod,
    ) -> Result<RentalRequest> {
        retry_on_conflict(&self.retry, || {
            self.rentals.request_rental_for_period(actor, book, period)
        })
        .await
    }

    pub async fn approve_rental(&self, actor: UserId, rental: RentalId) -> Result<RentalRequest> {
        retry_on_conflict(&self.retry, || self.rentals.approve_rental(actor, rental)).await
    }

    pub async fn reject_rental(&self, actor: UserId, rental: RentalId) -> Result<RentalRequest> {
        retry_on_conflict(&self.retry, || self.rentals.reject_rental(actor, rental)).await
    }

    pub async fn return_book(&self, actor: UserId, rental: RentalId) -> Result<RentalRequest> {
        retry_on_conflict(&self.retry, || self.rentals.return_book(actor, rental)).await
    }

    pub async fn get_rental(&self, rental: RentalId) -> Result<RentalRequest> {
        self.rentals.get_rental(rental).await
    }

    pub async fn rentals_for(&self, actor: UserId) -> Result<Vec<RentalRequest>> {
        self.rentals.rentals_for(actor).await
    }

    pub async fn my_rentals(&self, renter: UserId) -> Result<Vec<RentalRequest>> {
        self.rentals.my_rentals(renter).await
    }

    pub async fn active_rentals(&self, renter: UserId) -> Result<Vec<RentalRequest>> {
        self.rentals.active_rentals(renter).await
    }

    pub async fn overdue_rentals(
        &self,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RentalRequest>> {
        self.rentals.overdue_rentals(actor, now).await
    }

    pub async fn pending_rental_requests(
        &self,
        owner: UserId,
    ) -> Result<Vec<BookRequests<RentalRequest>>> {
        self.rentals.pending_rental_requests(owner).await
    }

    pub async fn all_rentals(&self) -> Result<Vec<RentalRequest>> {
        self.store.query_rentals(&RentalFilter::default()).await
    }

    // Purchases

    pub async fn request_purchase(&self, actor: UserId, book: BookId) -> Result<PurchaseRequest> {
        retry_on_conflict(&self.retry, || self.purchases.request_purchase(actor, book)).await
    }

    pub async fn approve_purchase(
        &self,
        actor: UserId,
        purchase: PurchaseId,
    ) -> Result<PurchaseRequest> {
        retry_on_conflict(&self.retry, || {
            self.purchases.approve_purchase(actor, purchase)
        })
        .await
    }

    pub async fn reject_purchase(
        &self,
        actor: UserId,
        purchase: PurchaseId,
    ) -> Result<PurchaseRequest> {
        retry_on_conflict(&self.retry, || {
            self.purchases.reject_purchase(actor, purchase)
        })
        .await
    }

    pub async fn get_purchase(&self, purchase: PurchaseId) -> Result<PurchaseRequest> {
        self.purchases.get_purchase(purchase).await
    }

    pub async fn my_purchases(&self, buyer: UserId) -> Result<Vec<PurchaseRequest>> {
        self.purchases.my_purchases(buyer).await
    }

    pub async fn pending_purchase_requests(
        &self,
        owner: UserId,
    ) -> Result<Vec<BookRequests<PurchaseRequest>>> {
        self.purchases.pending_purchase_requests(owner).await
    }

    pub async fn all_purchases(&self) -> Result<Vec<PurchaseRequest>> {
        self.store
            .query_purchases(&PurchaseFilter::default())
            .await
    }

    // Reviews

    pub async fn add_review(
        &self,
        reviewer: UserId,
        book: BookId,
        rating: Stars,
        body: &str,
    ) -> Result<(Review, Book)> {
        retry_on_conflict(&self.retry, || {
            self.reviews.add_review(reviewer, book, rating, body)
        })
        .await
    }

    pub async fn get_review(&self, review: ReviewId) -> Result<Review> {
        self.reviews.get_review(review).await
    }

    pub async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>> {
        self.reviews.reviews_for_book(book).await
    }

    pub async fn reviews_by(&self, reviewer: UserId) -> Result<Vec<Review>> {
        self.reviews.reviews_by(reviewer).await
    }
}
