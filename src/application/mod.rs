//! Application layer containing the workflow orchestration.
//!
//! Each workflow reads the current book and its sibling requests from the
//! `EntityStore`, asks the availability state machine for a transition and
//! commits the result as a single change set. The `Marketplace` facade bundles
//! the workflows and replays commits that lost a concurrent race.

pub mod catalog;
pub mod command;
pub mod marketplace;
pub mod purchase;
pub mod rental;
pub mod retry;
pub mod review;

use crate::domain::availability::BookLedger;
use crate::domain::book::Book;
use crate::domain::ids::BookId;
use crate::domain::ports::EntityStore;
use crate::domain::query::{PurchaseFilter, RentalFilter};
use crate::domain::record::EntityKind;
use crate::error::{MarketError, Result};
use serde::Serialize;

/// Reads one book and every request that references it.
pub(crate) async fn load_ledger(store: &dyn EntityStore, book_id: BookId) -> Result<BookLedger> {
    let book = store
        .get_book(book_id)
        .await?
        .ok_or_else(|| MarketError::not_found(EntityKind::Book, book_id))?;
    let rentals = store.query_rentals(&RentalFilter::for_book(book_id)).await?;
    let purchases = store
        .query_purchases(&PurchaseFilter::for_book(book_id))
        .await?;
    Ok(BookLedger::new(book, rentals, purchases))
}

/// Pending requests on one of the caller's books.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRequests<T> {
    pub book: Book,
    pub requests: Vec<T>,
}

/// Groups `requests` under the books they reference, in book order.
///
/// Books without a request are dropped.
pub(crate) fn group_by_book<T, F>(books: Vec<Book>, requests: Vec<T>, book_of: F) -> Vec<BookRequests<T>>
where
    F: Fn(&T) -> BookId,
{
    let mut groups: Vec<BookRequests<T>> = books
        .into_iter()
        .map(|book| BookRequests {
            book,
            requests: Vec::new(),
        })
        .collect();
    for request in requests {
        let book_id = book_of(&request);
        if let Some(group) = groups.iter_mut().find(|g| g.book.id == book_id) {
            group.requests.push(request);
        }
    }
    groups.retain(|g| !g.requests.is_empty());
    groups
}
