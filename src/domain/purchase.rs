use super::ids::{BookId, PurchaseId, UserId};
use super::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Rejected,
}

impl PurchaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }
}

/// A request to buy a book.
///
/// `price` is the book's sale price at request time and does not follow later
/// price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: PurchaseId,
    pub book_id: BookId,
    pub buyer_id: UserId,
    pub price: Price,
    pub status: PurchaseStatus,
    pub owner_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl PurchaseRequest {
    pub fn new(
        id: PurchaseId,
        book_id: BookId,
        buyer_id: UserId,
        price: Price,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            book_id,
            buyer_id,
            price,
            status: PurchaseStatus::Pending,
            owner_approval: false,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub(crate) fn complete(&mut self, now: DateTime<Utc>) {
        self.status = PurchaseStatus::Completed;
        self.owner_approval = true;
        self.touch(now);
    }

    pub(crate) fn reject(&mut self, now: DateTime<Utc>) {
        self.status = PurchaseStatus::Rejected;
        self.owner_approval = false;
        self.touch(now);
    }
}
