use super::{BookRequests, group_by_book, load_ledger};
use crate::domain::book::Book;
use crate::domain::ids::{BookId, RentalId, UserId};
use crate::domain::ports::EntityStoreRef;
use crate::domain::query::{BookFilter, RentalFilter};
use crate::domain::record::{ChangeSet, EntityKind};
use crate::domain::rental::{RentalPeriod, RentalRequest, RentalStatus};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Request, approve, reject and return rentals.
///
/// Every operation performs a single commit. Admissions, approvals and
/// returns rewrite the book as well, so they conflict with any other such
/// operation on the same book and one of them fails with `ConflictRetry`.
#[derive(Clone)]
pub struct RentalWorkflow {
    store: EntityStoreRef,
    default_days: u32,
}

impl RentalWorkflow {
    pub fn new(store: EntityStoreRef, default_days: u32) -> Self {
        Self {
            store,
            default_days,
        }
    }

    /// Requests a rental starting now for `days` (or the configured default).
    pub async fn request_rental(
        &self,
        actor: UserId,
        book: BookId,
        days: Option<u32>,
    ) -> Result<RentalRequest> {
        let period = RentalPeriod::starting_at(Utc::now(), days.unwrap_or(self.default_days))?;
        self.request_rental_for_period(actor, book, period).await
    }

    pub async fn request_rental_for_period(
        &self,
        actor: UserId,
        book_id: BookId,
        period: RentalPeriod,
    ) -> Result<RentalRequest> {
        let ledger = load_ledger(self.store.as_ref(), book_id).await?;
        ledger.admit_rental(actor)?;
        debug!(book = %book_id, actor = %actor, "Rental request admitted");

        let now = Utc::now();
        let id = RentalId::new(self.store.next_id(EntityKind::Rental).await?);
        let rental = RentalRequest::new(
            id,
            book_id,
            actor,
            period,
            ledger.book.pricing.price_per_day,
            now,
        )?;
        let changes = ChangeSet::new()
            .insert(rental.clone())
            .update(ledger.anchor(now));
        self.store.commit(changes).await?;

        info!(book = %book_id, actor = %actor, rental = %id, "Rental requested");
        Ok(rental)
    }

    /// Activates a pending rental and rejects every other pending request on
    /// the book in the same commit.
    pub async fn approve_rental(&self, actor: UserId, id: RentalId) -> Result<RentalRequest> {
        let rental = self.get_rental(id).await?;
        let ledger = load_ledger(self.store.as_ref(), rental.book_id).await?;
        let plan = ledger.plan_rental_approval(id, actor)?;

        let transition = plan.apply(&ledger, Utc::now())?;
        let approved = transition
            .rental(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(EntityKind::Rental, id))?;
        self.store.commit(transition.into_change_set()).await?;

        info!(
            book = %rental.book_id,
            actor = %actor,
            rental = %id,
            rejected = plan.reject_set.len(),
            "Rental approved"
        );
        Ok(approved)
    }

    pub async fn reject_rental(&self, actor: UserId, id: RentalId) -> Result<RentalRequest> {
        let rental = self.get_rental(id).await?;
        let ledger = load_ledger(self.store.as_ref(), rental.book_id).await?;
        let transition = ledger.plan_rental_rejection(id, actor, Utc::now())?;
        let rejected = transition
            .rental(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(EntityKind::Rental, id))?;
        self.store.commit(transition.into_change_set()).await?;

        info!(book = %rental.book_id, actor = %actor, rental = %id, "Rental rejected");
        Ok(rejected)
    }

    /// Ends an active rental. The book re-opens unless it has been sold.
    pub async fn return_book(&self, actor: UserId, id: RentalId) -> Result<RentalRequest> {
        let rental = self.get_rental(id).await?;
        let ledger = load_ledger(self.store.as_ref(), rental.book_id).await?;
        let transition = ledger.plan_return(id, actor, Utc::now())?;
        let returned = transition
            .rental(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(EntityKind::Rental, id))?;
        self.store.commit(transition.into_change_set()).await?;

        info!(book = %rental.book_id, actor = %actor, rental = %id, "Book returned");
        Ok(returned)
    }

    pub async fn get_rental(&self, id: RentalId) -> Result<RentalRequest> {
        self.store
            .get_rental(id)
            .await?
            .ok_or_else(|| MarketError::not_found(EntityKind::Rental, id))
    }

    /// Rentals where the actor is the renter or owns the rented book.
    pub async fn rentals_for(&self, actor: UserId) -> Result<Vec<RentalRequest>> {
        let mut merged = BTreeMap::new();
        for rental in self.my_rentals(actor).await? {
            merged.insert(rental.id, rental);
        }
        let owned = self.owned_book_ids(actor).await?;
        if !owned.is_empty() {
            let filter = RentalFilter::for_books(owned);
            for rental in self.store.query_rentals(&filter).await? {
                merged.entry(rental.id).or_insert(rental);
            }
        }
        Ok(merged.into_values().collect())
    }

    pub async fn my_rentals(&self, renter: UserId) -> Result<Vec<RentalRequest>> {
        self.store
            .query_rentals(&RentalFilter::by_renter(renter))
            .await
    }

    pub async fn active_rentals(&self, renter: UserId) -> Result<Vec<RentalRequest>> {
        let filter = RentalFilter::by_renter(renter).with_status([RentalStatus::Active]);
        self.store.query_rentals(&filter).await
    }

    /// Active rentals past their end date, as seen by renter or owner.
    pub async fn overdue_rentals(
        &self,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RentalRequest>> {
        let visible = self.rentals_for(actor).await?;
        Ok(visible.into_iter().filter(|r| r.is_overdue(now)).collect())
    }

    /// Pending rental requests on the owner's books, grouped by book.
    pub async fn pending_rental_requests(
        &self,
        owner: UserId,
    ) -> Result<Vec<BookRequests<RentalRequest>>> {
        let books = self.owned_books(owner).await?;
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let filter = RentalFilter::for_books(books.iter().map(|b| b.id).collect())
            .with_status([RentalStatus::Pending]);
        let pending = self.store.query_rentals(&filter).await?;
        Ok(group_by_book(books, pending, |r| r.book_id))
    }

    async fn owned_books(&self, owner: UserId) -> Result<Vec<Book>> {
        self.store.query_books(&BookFilter::owned_by(owner)).await
    }

    async fn owned_book_ids(&self, owner: UserId) -> Result<Vec<BookId>> {
        Ok(self.owned_books(owner).await?.iter().map(|b| b.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::Catalog;
    use crate::domain::money::Pricing;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const OWNER: UserId = UserId::new(1);
    const ALICE: UserId = UserId::new(2);
    const BOB: UserId = UserId::new(3);

    async fn setup() -> (RentalWorkflow, Book) {
        let store: EntityStoreRef = Arc::new(InMemoryStore::new());
        let catalog = Catalog::new(store.clone());
        let pricing = Pricing::new(dec!(10), dec!(100)).unwrap();
        let book = catalog.list_book(OWNER, "Bleak House", pricing).await.unwrap();
        (RentalWorkflow::new(store, 14), book)
    }

    #[tokio::test]
    async fn test_request_uses_default_duration() {
        let (rentals, book) = setup().await;
        let rental = rentals.request_rental(ALICE, book.id, None).await.unwrap();

        assert_eq!(rental.status, RentalStatus::Pending);
        assert_eq!(rental.period.billable_days(), 14);
        assert_eq!(rental.total_price.value(), dec!(140));
    }

    #[tokio::test]
    async fn test_explicit_period_must_be_positive() {
        let (rentals, book) = setup().await;
        let zero = rentals.request_rental(ALICE, book.id, Some(0)).await;
        assert!(matches!(zero, Err(MarketError::InvalidRange)));

        let start = Utc::now();
        let period = RentalPeriod::new(start, start + Duration::hours(36)).unwrap();
        let rental = rentals
            .request_rental_for_period(ALICE, book.id, period)
            .await
            .unwrap();
        // A started day is billed in full.
        assert_eq!(rental.total_price.value(), dec!(20));
    }

    #[tokio::test]
    async fn test_request_on_missing_book() {
        let (rentals, _) = setup().await;
        let result = rentals.request_rental(ALICE, BookId::new(99), None).await;
        assert!(matches!(result, Err(MarketError::NotFound { kind: EntityKind::Book, .. })));
    }

    #[tokio::test]
    async fn test_approve_then_return() {
        let (rentals, book) = setup().await;
        let first = rentals.request_rental(ALICE, book.id, Some(3)).await.unwrap();
        let second = rentals.request_rental(BOB, book.id, Some(3)).await.unwrap();

        let approved = rentals.approve_rental(OWNER, first.id).await.unwrap();
        assert_eq!(approved.status, RentalStatus::Active);
        assert!(approved.owner_approval);
        let loser = rentals.get_rental(second.id).await.unwrap();
        assert_eq!(loser.status, RentalStatus::Rejected);

        assert_eq!(rentals.active_rentals(ALICE).await.unwrap().len(), 1);

        let returned = rentals.return_book(ALICE, first.id).await.unwrap();
        assert_eq!(returned.status, RentalStatus::Returned);
        assert!(rentals.active_rentals(ALICE).await.unwrap().is_empty());
        assert!(rentals.request_rental(BOB, book.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_reject_leaves_book_open() {
        let (rentals, book) = setup().await;
        let rental = rentals.request_rental(ALICE, book.id, None).await.unwrap();

        let denied = rentals.reject_rental(BOB, rental.id).await;
        assert!(matches!(denied, Err(MarketError::Forbidden { .. })));

        let rejected = rentals.reject_rental(OWNER, rental.id).await.unwrap();
        assert_eq!(rejected.status, RentalStatus::Rejected);
        assert!(!rejected.owner_approval);

        let again = rentals.reject_rental(OWNER, rental.id).await;
        assert!(matches!(again, Err(MarketError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_rentals_for_merges_renter_and_owner_views() {
        let (rentals, book) = setup().await;
        rentals.request_rental(ALICE, book.id, None).await.unwrap();
        rentals.request_rental(BOB, book.id, None).await.unwrap();

        assert_eq!(rentals.rentals_for(OWNER).await.unwrap().len(), 2);
        assert_eq!(rentals.rentals_for(ALICE).await.unwrap().len(), 1);

        let groups = rentals.pending_rental_requests(OWNER).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].book.id, book.id);
        assert_eq!(groups[0].requests.len(), 2);
        assert!(rentals.pending_rental_requests(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overdue_rentals() {
        let (rentals, book) = setup().await;
        let rental = rentals.request_rental(ALICE, book.id, Some(2)).await.unwrap();
        rentals.approve_rental(OWNER, rental.id).await.unwrap();

        let now = Utc::now();
        assert!(rentals.overdue_rentals(ALICE, now).await.unwrap().is_empty());

        let later = now + Duration::days(3);
        assert_eq!(rentals.overdue_rentals(ALICE, later).await.unwrap().len(), 1);
        assert_eq!(rentals.overdue_rentals(OWNER, later).await.unwrap().len(), 1);
        assert!(rentals.overdue_rentals(BOB, later).await.unwrap().is_empty());
    }
}
