//! Filters understood by every store backend.
//!
//! Each field is an equality or set-membership predicate on an indexed field;
//! `None` means "any". A record matches when every set predicate holds.

use super::book::Book;
use super::ids::{BookId, PurchaseId, RentalId, UserId};
use super::purchase::{PurchaseRequest, PurchaseStatus};
use super::rental::{RentalRequest, RentalStatus};
use super::review::Review;

fn member<T: PartialEq>(set: &Option<Vec<T>>, value: &T) -> bool {
    set.as_ref().is_none_or(|s| s.contains(value))
}

fn equal<T: PartialEq>(expected: &Option<T>, value: &T) -> bool {
    expected.as_ref().is_none_or(|e| e == value)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub owner_id: Option<UserId>,
    pub ids: Option<Vec<BookId>>,
    pub rentable: Option<bool>,
    pub purchasable: Option<bool>,
}

impl BookFilter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner_id: Some(owner),
            ..Self::default()
        }
    }

    pub fn fully_available() -> Self {
        Self {
            rentable: Some(true),
            purchasable: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        equal(&self.owner_id, &book.owner_id)
            && member(&self.ids, &book.id)
            && equal(&self.rentable, &book.rentable)
            && equal(&self.purchasable, &book.purchasable)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalFilter {
    pub ids: Option<Vec<RentalId>>,
    pub book_in: Option<Vec<BookId>>,
    pub renter_id: Option<UserId>,
    pub status_in: Option<Vec<RentalStatus>>,
}

impl RentalFilter {
    pub fn for_book(book: BookId) -> Self {
        Self::for_books(vec![book])
    }

    pub fn for_books(books: Vec<BookId>) -> Self {
        Self {
            book_in: Some(books),
            ..Self::default()
        }
    }

    pub fn by_renter(renter: UserId) -> Self {
        Self {
            renter_id: Some(renter),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, statuses: impl Into<Vec<RentalStatus>>) -> Self {
        self.status_in = Some(statuses.into());
        self
    }

    pub fn matches(&self, rental: &RentalRequest) -> bool {
        member(&self.ids, &rental.id)
            && member(&self.book_in, &rental.book_id)
            && equal(&self.renter_id, &rental.renter_id)
            && member(&self.status_in, &rental.status)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseFilter {
    pub ids: Option<Vec<PurchaseId>>,
    pub book_in: Option<Vec<BookId>>,
    pub buyer_id: Option<UserId>,
    pub status_in: Option<Vec<PurchaseStatus>>,
}

impl PurchaseFilter {
    pub fn for_book(book: BookId) -> Self {
        Self::for_books(vec![book])
    }

    pub fn for_books(books: Vec<BookId>) -> Self {
        Self {
            book_in: Some(books),
            ..Self::default()
        }
    }

    pub fn by_buyer(buyer: UserId) -> Self {
        Self {
            buyer_id: Some(buyer),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, statuses: impl Into<Vec<PurchaseStatus>>) -> Self {
        self.status_in = Some(statuses.into());
        self
    }

    pub fn matches(&self, purchase: &PurchaseRequest) -> bool {
        member(&self.ids, &purchase.id)
            && member(&self.book_in, &purchase.book_id)
            && equal(&self.buyer_id, &purchase.buyer_id)
            && member(&self.status_in, &purchase.status)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub book_id: Option<BookId>,
    pub reviewer_id: Option<UserId>,
}

impl ReviewFilter {
    pub fn for_book(book: BookId) -> Self {
        Self {
            book_id: Some(book),
            ..Self::default()
        }
    }

    pub fn by_reviewer(reviewer: UserId) -> Self {
        Self {
            reviewer_id: Some(reviewer),
            ..Self::default()
        }
    }

    pub fn matches(&self, review: &Review) -> bool {
        equal(&self.book_id, &review.book_id) && equal(&self.reviewer_id, &review.reviewer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Price;
    use crate::domain::rental::RentalPeriod;
    use chrono::Utc;

    fn rental(id: u64, book: u64, renter: u64) -> RentalRequest {
        let now = Utc::now();
        RentalRequest::new(
            RentalId::new(id),
            BookId::new(book),
            UserId::new(renter),
            RentalPeriod::starting_at(now, 3).unwrap(),
            Price::ZERO,
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(RentalFilter::default().matches(&rental(1, 1, 1)));
    }

    #[test]
    fn test_rental_filter_membership() {
        let filter = RentalFilter::for_books(vec![BookId::new(1), BookId::new(2)])
            .with_status([RentalStatus::Pending]);
        assert!(filter.matches(&rental(1, 2, 5)));
        assert!(!filter.matches(&rental(1, 3, 5)));

        let mut active = rental(2, 1, 5);
        active.activate(Utc::now());
        assert!(!filter.matches(&active));
    }

    #[test]
    fn test_rental_filter_by_renter() {
        let filter = RentalFilter::by_renter(UserId::new(5));
        assert!(filter.matches(&rental(1, 1, 5)));
        assert!(!filter.matches(&rental(1, 1, 6)));
    }
}
