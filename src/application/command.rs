use crate::domain::book::Book;
use crate::domain::ids::{BookId, PurchaseId, RentalId, UserId};
use crate::domain::money::Pricing;
use crate::domain::purchase::PurchaseRequest;
use crate::domain::rental::RentalRequest;
use crate::domain::review::{Review, Stars};
use serde::Serialize;

/// One already-authenticated call into the workflows.
///
/// `actor` is trusted as given; authority checks happen inside the workflows.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListBook {
        owner: UserId,
        title: String,
        pricing: Pricing,
    },
    UpdatePrice {
        actor: UserId,
        book: BookId,
        pricing: Pricing,
    },
    RequestRental {
        actor: UserId,
        book: BookId,
        days: Option<u32>,
    },
    ApproveRental {
        actor: UserId,
        rental: RentalId,
    },
    RejectRental {
        actor: UserId,
        rental: RentalId,
    },
    ReturnBook {
        actor: UserId,
        rental: RentalId,
    },
    RequestPurchase {
        actor: UserId,
        book: BookId,
    },
    ApprovePurchase {
        actor: UserId,
        purchase: PurchaseId,
    },
    RejectPurchase {
        actor: UserId,
        purchase: PurchaseId,
    },
    Review {
        actor: UserId,
        book: BookId,
        rating: Stars,
        body: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListBook { .. } => "list_book",
            Self::UpdatePrice { .. } => "update_price",
            Self::RequestRental { .. } => "request_rental",
            Self::ApproveRental { .. } => "approve_rental",
            Self::RejectRental { .. } => "reject_rental",
            Self::ReturnBook { .. } => "return_book",
            Self::RequestPurchase { .. } => "request_purchase",
            Self::ApprovePurchase { .. } => "approve_purchase",
            Self::RejectPurchase { .. } => "reject_purchase",
            Self::Review { .. } => "review",
        }
    }

    pub fn actor(&self) -> UserId {
        match self {
            Self::ListBook { owner, .. } => *owner,
            Self::UpdatePrice { actor, .. }
            | Self::RequestRental { actor, .. }
            | Self::ApproveRental { actor, .. }
            | Self::RejectRental { actor, .. }
            | Self::ReturnBook { actor, .. }
            | Self::RequestPurchase { actor, .. }
            | Self::ApprovePurchase { actor, .. }
            | Self::RejectPurchase { actor, .. }
            | Self::Review { actor, .. } => *actor,
        }
    }
}

/// The record a successful command produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    Book(Book),
    Rental(RentalRequest),
    Purchase(PurchaseRequest),
    Review(Review),
}
