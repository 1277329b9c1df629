use super::load_ledger;
use crate::domain::availability::BookState;
use crate::domain::book::Book;
use crate::domain::ids::{BookId, UserId};
use crate::domain::money::Pricing;
use crate::domain::ports::EntityStoreRef;
use crate::domain::query::BookFilter;
use crate::domain::record::EntityKind;
use crate::error::{MarketError, Result};
use chrono::Utc;
use tracing::info;

/// Book listings: creation, repricing and the owner/viewer projections.
#[derive(Clone)]
pub struct Catalog {
    store: EntityStoreRef,
}

impl Catalog {
    pub fn new(store: EntityStoreRef) -> Self {
        Self { store }
    }

    /// Lists a new book. It starts open for both rental and purchase.
    pub async fn list_book(&self, owner: UserId, title: &str, pricing: Pricing) -> Result<Book> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MarketError::ValidationError(
                "Book title must not be empty".to_string(),
            ));
        }
        let id = BookId::new(self.store.next_id(EntityKind::Book).await?);
        let book = Book::new(id, owner, title, pricing, Utc::now());
        self.store.insert(book.clone().into()).await?;
        info!(book = %id, owner = %owner, "Book listed");
        Ok(book)
    }

    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| MarketError::not_found(EntityKind::Book, id))
    }

    /// Changes the book's prices. Requests already filed keep their snapshot.
    pub async fn update_pricing(&self, actor: UserId, id: BookId, pricing: Pricing) -> Result<Book> {
        let mut book = self.get_book(id).await?;
        if !book.is_owned_by(actor) {
            return Err(MarketError::NotOwner { actor, book: id });
        }
        book.pricing = pricing;
        book.touch(Utc::now());
        self.store.update(book.clone().into()).await?;
        info!(book = %id, "Book repriced");
        Ok(book)
    }

    pub async fn my_books(&self, owner: UserId) -> Result<Vec<Book>> {
        self.store.query_books(&BookFilter::owned_by(owner)).await
    }

    /// Books open for both rental and purchase, excluding the viewer's own.
    pub async fn available_books(&self, viewer: UserId) -> Result<Vec<Book>> {
        let books = self
            .store
            .query_books(&BookFilter::fully_available())
            .await?;
        Ok(books.into_iter().filter(|b| !b.is_owned_by(viewer)).collect())
    }

    pub async fn all_books(&self) -> Result<Vec<Book>> {
        self.store.query_books(&BookFilter::default()).await
    }

    pub async fn book_state(&self, id: BookId) -> Result<BookState> {
        Ok(load_ledger(self.store.as_ref(), id).await?.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(InMemoryStore::new()))
    }

    fn pricing() -> Pricing {
        Pricing::new(dec!(1.25), dec!(20)).unwrap()
    }

    #[tokio::test]
    async fn test_list_book_assigns_sequential_ids() {
        let catalog = catalog();
        let first = catalog.list_book(UserId::new(1), "Dubliners", pricing()).await.unwrap();
        let second = catalog.list_book(UserId::new(1), "  Ulysses ", pricing()).await.unwrap();

        assert_eq!(first.id, BookId::new(1));
        assert_eq!(second.id, BookId::new(2));
        assert_eq!(second.title, "Ulysses");
        assert!(first.rentable && first.purchasable);
        assert_eq!(catalog.book_state(first.id).await.unwrap(), BookState::Open);
    }

    #[tokio::test]
    async fn test_list_book_rejects_blank_title() {
        let result = catalog().list_book(UserId::new(1), "   ", pricing()).await;
        assert!(matches!(result, Err(MarketError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_pricing_is_owner_only() {
        let catalog = catalog();
        let book = catalog.list_book(UserId::new(1), "Dubliners", pricing()).await.unwrap();
        let new_pricing = Pricing::new(dec!(2), dec!(25)).unwrap();

        let denied = catalog.update_pricing(UserId::new(2), book.id, new_pricing).await;
        assert!(matches!(denied, Err(MarketError::NotOwner { .. })));

        let updated = catalog
            .update_pricing(UserId::new(1), book.id, new_pricing)
            .await
            .unwrap();
        assert_eq!(updated.pricing, new_pricing);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_available_books_hides_own_listings() {
        let catalog = catalog();
        catalog.list_book(UserId::new(1), "Dubliners", pricing()).await.unwrap();
        catalog.list_book(UserId::new(2), "Ulysses", pricing()).await.unwrap();

        let visible = catalog.available_books(UserId::new(1)).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Ulysses");
        assert_eq!(catalog.my_books(UserId::new(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_book() {
        let result = catalog().get_book(BookId::new(42)).await;
        assert!(matches!(
            result,
            Err(MarketError::NotFound { kind: EntityKind::Book, id: 42 })
        ));
    }
}
