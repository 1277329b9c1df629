//! Availability state machine.
//!
//! A book's state is never stored as such. It is derived from its requests:
//!
//! * `Open`: no ACTIVE rental and no COMPLETED purchase, both flags true.
//! * `Rented`: exactly one ACTIVE rental, both flags false.
//! * `Sold`: exactly one COMPLETED purchase, both flags false. Terminal.
//!
//! Every transition is first planned against a `BookLedger` snapshot and turned
//! into a `Transition`: the full set of records to rewrite. The workflow then
//! commits that set in one step, so an approval and all of its cascading
//! rejections land together or not at all.

use super::book::Book;
use super::ids::{BookId, PurchaseId, RentalId, RequestId, UserId};
use super::purchase::{PurchaseRequest, PurchaseStatus};
use super::record::{ChangeSet, EntityKind};
use super::rental::{RentalRequest, RentalStatus};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookState {
    Open,
    Rented(RentalId),
    Sold(PurchaseId),
}

impl BookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Rented(_) => "rented",
            Self::Sold(_) => "sold",
        }
    }
}

impl fmt::Display for BookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One book together with every rental and purchase request that references it.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLedger {
    pub book: Book,
    pub rentals: Vec<RentalRequest>,
    pub purchases: Vec<PurchaseRequest>,
}

/// Outcome of a successful approval plan.
///
/// `reject_set` lists every PENDING sibling that must be rejected in the same
/// commit. Its order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalTransaction {
    pub approve: RequestId,
    pub reject_set: Vec<RequestId>,
}

/// Records rewritten by one transition. `book` is absent for plain rejections.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub book: Option<Book>,
    pub rentals: Vec<RentalRequest>,
    pub purchases: Vec<PurchaseRequest>,
}

impl Transition {
    pub fn rental(&self, id: RentalId) -> Option<&RentalRequest> {
        self.rentals.iter().find(|r| r.id == id)
    }

    pub fn purchase(&self, id: PurchaseId) -> Option<&PurchaseRequest> {
        self.purchases.iter().find(|p| p.id == id)
    }

    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if let Some(book) = self.book {
            changes.push_update(book);
        }
        for rental in self.rentals {
            changes.push_update(rental);
        }
        for purchase in self.purchases {
            changes.push_update(purchase);
        }
        changes
    }
}

impl BookLedger {
    pub fn new(book: Book, rentals: Vec<RentalRequest>, purchases: Vec<PurchaseRequest>) -> Self {
        Self {
            book,
            rentals,
            purchases,
        }
    }

    pub fn book_id(&self) -> BookId {
        self.book.id
    }

    pub fn state(&self) -> BookState {
        if let Some(p) = self
            .purchases
            .iter()
            .find(|p| p.status == PurchaseStatus::Completed)
        {
            return BookState::Sold(p.id);
        }
        if let Some(r) = self
            .rentals
            .iter()
            .find(|r| r.status == RentalStatus::Active)
        {
            return BookState::Rented(r.id);
        }
        BookState::Open
    }

    /// Checks the stored flags against the requests.
    ///
    /// Both flags true means no ACTIVE rental and no COMPLETED purchase; both
    /// false means exactly one of the two. Mixed flags never occur.
    pub fn is_consistent(&self) -> bool {
        let active = self
            .rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Active)
            .count();
        let completed = self
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Completed)
            .count();
        match (self.book.rentable, self.book.purchasable) {
            (true, true) => active == 0 && completed == 0,
            (false, false) => (active, completed) == (1, 0) || (active, completed) == (0, 1),
            _ => false,
        }
    }

    /// Copy of the book with its version bumped.
    ///
    /// Every transition that admits, approves or returns a request rewrites the
    /// book, so two such transitions on one book can never both commit.
    pub fn anchor(&self, now: DateTime<Utc>) -> Book {
        let mut book = self.book.clone();
        book.touch(now);
        book
    }

    pub fn rental(&self, id: RentalId) -> Result<&RentalRequest> {
        self.rentals
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| MarketError::not_found(EntityKind::Rental, id))
    }

    pub fn purchase(&self, id: PurchaseId) -> Result<&PurchaseRequest> {
        self.purchases
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| MarketError::not_found(EntityKind::Purchase, id))
    }

    pub fn admit_rental(&self, renter: UserId) -> Result<()> {
        let book = self.book_id();
        if !self.book.rentable {
            return Err(MarketError::NotAvailable { book, action: "rent" });
        }
        if self.book.is_owned_by(renter) {
            return Err(MarketError::SelfTransactionDenied {
                actor: renter,
                book,
                action: "rent",
            });
        }
        if self
            .rentals
            .iter()
            .any(|r| r.renter_id == renter && r.status.is_live())
        {
            return Err(MarketError::DuplicateRequest {
                actor: renter,
                book,
                action: "rental",
            });
        }
        Ok(())
    }

    pub fn admit_purchase(&self, buyer: UserId) -> Result<()> {
        let book = self.book_id();
        if !self.book.purchasable {
            return Err(MarketError::NotAvailable {
                book,
                action: "purchase",
            });
        }
        if self.book.is_owned_by(buyer) {
            return Err(MarketError::SelfTransactionDenied {
                actor: buyer,
                book,
                action: "buy",
            });
        }
        if self
            .purchases
            .iter()
            .any(|p| p.buyer_id == buyer && p.status.is_live())
        {
            return Err(MarketError::DuplicateRequest {
                actor: buyer,
                book,
                action: "purchase",
            });
        }
        Ok(())
    }

    fn require_owner(&self, actor: UserId, request: RequestId, action: &'static str) -> Result<()> {
        if self.book.is_owned_by(actor) {
            Ok(())
        } else {
            Err(MarketError::Forbidden {
                actor,
                request,
                action,
            })
        }
    }

    fn pending_siblings(&self, approved: RequestId) -> Vec<RequestId> {
        let rentals = self
            .rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Pending)
            .map(|r| RequestId::Rental(r.id));
        let purchases = self
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Pending)
            .map(|p| RequestId::Purchase(p.id));
        rentals.chain(purchases).filter(|id| *id != approved).collect()
    }

    pub fn plan_rental_approval(&self, id: RentalId, actor: UserId) -> Result<ApprovalTransaction> {
        let rental = self.rental(id)?;
        let request = RequestId::Rental(id);
        self.require_owner(actor, request, "approve")?;
        if rental.status != RentalStatus::Pending {
            return Err(MarketError::InvalidState {
                request,
                status: rental.status.as_str(),
                action: "approve",
            });
        }
        if self.state() != BookState::Open {
            return Err(MarketError::NotAvailable {
                book: self.book_id(),
                action: "rent",
            });
        }
        Ok(ApprovalTransaction {
            approve: request,
            reject_set: self.pending_siblings(request),
        })
    }

    pub fn plan_purchase_approval(
        &self,
        id: PurchaseId,
        actor: UserId,
    ) -> Result<ApprovalTransaction> {
        let purchase = self.purchase(id)?;
        let request = RequestId::Purchase(id);
        self.require_owner(actor, request, "approve")?;
        if purchase.status != PurchaseStatus::Pending {
            return Err(MarketError::InvalidState {
                request,
                status: purchase.status.as_str(),
                action: "approve",
            });
        }
        match self.state() {
            BookState::Sold(_) => {
                return Err(MarketError::NotAvailable {
                    book: self.book_id(),
                    action: "purchase",
                });
            }
            BookState::Rented(rental) => {
                // Only reachable when an earlier cascade was skipped. The most
                // recent approval wins; the stale rental is left as is.
                tracing::warn!(
                    book = %self.book_id(),
                    rental = %rental,
                    purchase = %id,
                    "Approving purchase while a rental is still active"
                );
            }
            BookState::Open => {}
        }
        Ok(ApprovalTransaction {
            approve: request,
            reject_set: self.pending_siblings(request),
        })
    }

    pub fn plan_rental_rejection(
        &self,
        id: RentalId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let rental = self.rental(id)?;
        let request = RequestId::Rental(id);
        self.require_owner(actor, request, "reject")?;
        if rental.status != RentalStatus::Pending {
            return Err(MarketError::InvalidState {
                request,
                status: rental.status.as_str(),
                action: "reject",
            });
        }
        let mut rental = rental.clone();
        rental.reject(now);
        Ok(Transition {
            book: None,
            rentals: vec![rental],
            purchases: Vec::new(),
        })
    }

    pub fn plan_purchase_rejection(
        &self,
        id: PurchaseId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let purchase = self.purchase(id)?;
        let request = RequestId::Purchase(id);
        self.require_owner(actor, request, "reject")?;
        if purchase.status != PurchaseStatus::Pending {
            return Err(MarketError::InvalidState {
                request,
                status: purchase.status.as_str(),
                action: "reject",
            });
        }
        let mut purchase = purchase.clone();
        purchase.reject(now);
        Ok(Transition {
            book: None,
            rentals: Vec::new(),
            purchases: vec![purchase],
        })
    }

    /// Plans a return. A sold book stays out of circulation.
    pub fn plan_return(&self, id: RentalId, actor: UserId, now: DateTime<Utc>) -> Result<Transition> {
        let rental = self.rental(id)?;
        let request = RequestId::Rental(id);
        if rental.renter_id != actor {
            return Err(MarketError::Forbidden {
                actor,
                request,
                action: "return",
            });
        }
        if rental.status != RentalStatus::Active {
            return Err(MarketError::InvalidState {
                request,
                status: rental.status.as_str(),
                action: "return",
            });
        }
        let mut book = self.anchor(now);
        if !matches!(self.state(), BookState::Sold(_)) {
            book.set_availability(true);
        }
        let mut rental = rental.clone();
        rental.mark_returned(now);
        Ok(Transition {
            book: Some(book),
            rentals: vec![rental],
            purchases: Vec::new(),
        })
    }
}

impl ApprovalTransaction {
    /// Applies the plan to a snapshot: approve one request, reject the rest and
    /// take the book out of circulation.
    pub fn apply(&self, ledger: &BookLedger, now: DateTime<Utc>) -> Result<Transition> {
        let mut book = ledger.anchor(now);
        book.set_availability(false);

        let mut rentals = Vec::new();
        let mut purchases = Vec::new();
        match self.approve {
            RequestId::Rental(id) => {
                let mut rental = ledger.rental(id)?.clone();
                rental.activate(now);
                rentals.push(rental);
            }
            RequestId::Purchase(id) => {
                let mut purchase = ledger.purchase(id)?.clone();
                purchase.complete(now);
                purchases.push(purchase);
            }
        }

        for sibling in &self.reject_set {
            match *sibling {
                RequestId::Rental(id) => {
                    let mut rental = ledger.rental(id)?.clone();
                    ensure_pending(
                        *sibling,
                        rental.status == RentalStatus::Pending,
                        rental.status.as_str(),
                    )?;
                    rental.reject(now);
                    rentals.push(rental);
                }
                RequestId::Purchase(id) => {
                    let mut purchase = ledger.purchase(id)?.clone();
                    ensure_pending(
                        *sibling,
                        purchase.status == PurchaseStatus::Pending,
                        purchase.status.as_str(),
                    )?;
                    purchase.reject(now);
                    purchases.push(purchase);
                }
            }
        }

        Ok(Transition {
            book: Some(book),
            rentals,
            purchases,
        })
    }
}

fn ensure_pending(request: RequestId, pending: bool, status: &'static str) -> Result<()> {
    if pending {
        Ok(())
    } else {
        Err(MarketError::InvalidState {
            request,
            status,
            action: "reject",
        })
    }
}
