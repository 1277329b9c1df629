use super::{BookRequests, group_by_book, load_ledger};
use crate::domain::ids::{BookId, PurchaseId, UserId};
use crate::domain::ports::EntityStoreRef;
use crate::domain::purchase::{PurchaseRequest, PurchaseStatus};
use crate::domain::query::{BookFilter, PurchaseFilter};
use crate::domain::record::{ChangeSet, EntityKind};
use crate::error::{MarketError, Result};
use chrono::Utc;
use tracing::{debug, info};

/// Request, approve and reject purchases. Approval is terminal for the book.
#[derive(Clone)]
pub struct PurchaseWorkflow {
    store: EntityStoreRef,
}

impl PurchaseWorkflow {
    pub fn new(store: EntityStoreRef) -> Self {
        Self { store }
    }

    /// Files a purchase request at the book's current sale price.
    pub async fn request_purchase(&self, actor: UserId, book_id: BookId) -> Result<PurchaseRequest> {
        let ledger = load_ledger(self.store.as_ref(), book_id).await?;
        ledger.admit_purchase(actor)?;
        debug!(book = %book_id, actor = %actor, "Purchase request admitted");

        let now = Utc::now();
        let id = PurchaseId::new(self.store.next_id(EntityKind::Purchase).await?);
        let purchase = PurchaseRequest::new(id, book_id, actor, ledger.book.pricing.price, now);
        let changes = ChangeSet::new()
            .insert(purchase.clone())
            .update(ledger.anchor(now));
        self.store.commit(changes).await?;

        info!(book = %book_id, actor = %actor, purchase = %id, "Purchase requested");
        Ok(purchase)
    }

    /// Completes the sale and rejects every pending rental and purchase on
    /// the book in the same commit.
    pub async fn approve_purchase(&self, actor: UserId, id: PurchaseId) -> Result<PurchaseRequest> {
        let purchase = self.get_purchase(id).await?;
        let ledger = load_ledger(self.store.as_ref(), purchase.book_id).await?;
        let plan = ledger.plan_purchase_approval(id, actor)?;

        let transition = plan.apply(&ledger, Utc::now())?;
        let completed = transition
            .purchase(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(EntityKind::Purchase, id))?;
        self.store.commit(transition.into_change_set()).await?;

        info!(
            book = %purchase.book_id,
            actor = %actor,
            purchase = %id,
            rejected = plan.reject_set.len(),
            "Purchase approved"
        );
        Ok(completed)
    }

    pub async fn reject_purchase(&self, actor: UserId, id: PurchaseId) -> Result<PurchaseRequest> {
        let purchase = self.get_purchase(id).await?;
        let ledger = load_ledger(self.store.as_ref(), purchase.book_id).await?;
        let transition = ledger.plan_purchase_rejection(id, actor, Utc::now())?;
        let rejected = transition
            .purchase(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found(EntityKind::Purchase, id))?;
        self.store.commit(transition.into_change_set()).await?;

        info!(book = %purchase.book_id, actor = %actor, purchase = %id, "Purchase rejected");
        Ok(rejected)
    }

    pub async fn get_purchase(&self, id: PurchaseId) -> Result<PurchaseRequest> {
        self.store
            .get_purchase(id)
            .await?
            .ok_or_else(|| MarketError::not_found(EntityKind::Purchase, id))
    }

    pub async fn my_purchases(&self, buyer: UserId) -> Result<Vec<PurchaseRequest>> {
        self.store
            .query_purchases(&PurchaseFilter::by_buyer(buyer))
            .await
    }

    /// Pending purchase requests on the owner's books, grouped by book.
    pub async fn pending_purchase_requests(
        &self,
        owner: UserId,
    ) -> Result<Vec<BookRequests<PurchaseRequest>>> {
        let books = self.store.query_books(&BookFilter::owned_by(owner)).await?;
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let filter = PurchaseFilter::for_books(books.iter().map(|b| b.id).collect())
            .with_status([PurchaseStatus::Pending]);
        let pending = self.store.query_purchases(&filter).await?;
        Ok(group_by_book(books, pending, |p| p.book_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::Catalog;
    use crate::domain::book::Book;
    use crate::domain::money::Pricing;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const OWNER: UserId = UserId::new(1);
    const ALICE: UserId = UserId::new(2);
    const BOB: UserId = UserId::new(3);

    async fn setup() -> (PurchaseWorkflow, Catalog, Book) {
        let store: EntityStoreRef = Arc::new(InMemoryStore::new());
        let catalog = Catalog::new(store.clone());
        let pricing = Pricing::new(dec!(3), dec!(45.50)).unwrap();
        let book = catalog.list_book(OWNER, "Hard Times", pricing).await.unwrap();
        (PurchaseWorkflow::new(store), catalog, book)
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_repricing() {
        let (purchases, catalog, book) = setup().await;
        let purchase = purchases.request_purchase(ALICE, book.id).await.unwrap();
        assert_eq!(purchase.price.value(), dec!(45.50));

        let repriced = Pricing::new(dec!(3), dec!(60)).unwrap();
        catalog.update_pricing(OWNER, book.id, repriced).await.unwrap();

        let stored = purchases.get_purchase(purchase.id).await.unwrap();
        assert_eq!(stored.price.value(), dec!(45.50));
    }

    #[tokio::test]
    async fn test_approval_sells_the_book() {
        let (purchases, catalog, book) = setup().await;
        let winner = purchases.request_purchase(ALICE, book.id).await.unwrap();
        let loser = purchases.request_purchase(BOB, book.id).await.unwrap();

        let completed = purchases.approve_purchase(OWNER, winner.id).await.unwrap();
        assert_eq!(completed.status, PurchaseStatus::Completed);
        assert!(completed.owner_approval);
        assert_eq!(
            purchases.get_purchase(loser.id).await.unwrap().status,
            PurchaseStatus::Rejected
        );

        let sold = catalog.get_book(book.id).await.unwrap();
        assert!(!sold.rentable && !sold.purchasable);

        let retry = purchases.request_purchase(BOB, book.id).await;
        assert!(matches!(retry, Err(MarketError::NotAvailable { .. })));
    }

    #[tokio::test]
    async fn test_owner_cannot_buy_own_book() {
        let (purchases, _, book) = setup().await;
        let result = purchases.request_purchase(OWNER, book.id).await;
        assert!(matches!(result, Err(MarketError::SelfTransactionDenied { .. })));
    }

    #[tokio::test]
    async fn test_reject_and_projections() {
        let (purchases, _, book) = setup().await;
        let purchase = purchases.request_purchase(ALICE, book.id).await.unwrap();

        let groups = purchases.pending_purchase_requests(OWNER).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].requests[0].id, purchase.id);

        let forbidden = purchases.approve_purchase(ALICE, purchase.id).await;
        assert!(matches!(forbidden, Err(MarketError::Forbidden { .. })));

        purchases.reject_purchase(OWNER, purchase.id).await.unwrap();
        assert!(purchases.pending_purchase_requests(OWNER).await.unwrap().is_empty());
        assert_eq!(purchases.my_purchases(ALICE).await.unwrap().len(), 1);

        // A rejected request does not count as a duplicate.
        assert!(purchases.request_purchase(ALICE, book.id).await.is_ok());
    }
}
