//! Store-facing envelope types: one `Record` per entity and the `ChangeSet`
//! a workflow commits in one atomic step.

use super::book::Book;
use super::purchase::PurchaseRequest;
use super::rental::RentalRequest;
use super::review::Review;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Book,
    Rental,
    Purchase,
    Review,
}

impl EntityKind {
    pub const ALL: [Self; 4] = [Self::Book, Self::Rental, Self::Purchase, Self::Review];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Rental => "rental",
            Self::Purchase => "purchase",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Book(Book),
    Rental(RentalRequest),
    Purchase(PurchaseRequest),
    Review(Review),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Book(_) => EntityKind::Book,
            Self::Rental(_) => EntityKind::Rental,
            Self::Purchase(_) => EntityKind::Purchase,
            Self::Review(_) => EntityKind::Review,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::Book(b) => b.id.value(),
            Self::Rental(r) => r.id.value(),
            Self::Purchase(p) => p.id.value(),
            Self::Review(r) => r.id.value(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Self::Book(b) => b.version,
            Self::Rental(r) => r.version,
            Self::Purchase(p) => p.version,
            Self::Review(r) => r.version,
        }
    }

    /// Human readable key, used in conflict messages.
    pub fn key(&self) -> String {
        format!("{} {}", self.kind(), self.id())
    }
}

impl From<Book> for Record {
    fn from(book: Book) -> Self {
        Self::Book(book)
    }
}

impl From<RentalRequest> for Record {
    fn from(rental: RentalRequest) -> Self {
        Self::Rental(rental)
    }
}

impl From<PurchaseRequest> for Record {
    fn from(purchase: PurchaseRequest) -> Self {
        Self::Purchase(purchase)
    }
}

impl From<Review> for Record {
    fn from(review: Review) -> Self {
        Self::Review(review)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Key must be absent; record must be at version 1.
    Insert(Record),
    /// Stored version must be exactly `record.version() - 1`.
    Update(Record),
}

impl Write {
    pub fn record(&self) -> &Record {
        match self {
            Self::Insert(r) | Self::Update(r) => r,
        }
    }
}

/// Writes applied all-or-nothing by `EntityStore::commit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    writes: Vec<Write>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, record: impl Into<Record>) -> Self {
        self.writes.push(Write::Insert(record.into()));
        self
    }

    pub fn update(mut self, record: impl Into<Record>) -> Self {
        self.writes.push(Write::Update(record.into()));
        self
    }

    pub fn push_update(&mut self, record: impl Into<Record>) {
        self.writes.push(Write::Update(record.into()));
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Checks every write against the currently stored versions.
    ///
    /// Inserts need an absent key at version 1; updates need the stored
    /// version to be exactly one less. Backends call this under their commit
    /// lock and apply nothing when it fails.
    pub fn validate<F>(&self, stored_version: F) -> Result<()>
    where
        F: Fn(EntityKind, u64) -> Result<Option<u64>>,
    {
        let mut seen = HashSet::new();
        for write in &self.writes {
            let record = write.record();
            if !seen.insert((record.kind(), record.id())) {
                return Err(MarketError::ConflictRetry(format!(
                    "{} written twice in one commit",
                    record.key()
                )));
            }
            let current = stored_version(record.kind(), record.id())?;
            match (write, current) {
                (Write::Insert(_), None) if record.version() == 1 => {}
                (Write::Insert(_), _) => return Err(MarketError::ConflictRetry(record.key())),
                (Write::Update(_), None) => {
                    return Err(MarketError::not_found(record.kind(), record.id()));
                }
                (Write::Update(_), Some(v)) if v + 1 == record.version() => {}
                (Write::Update(_), Some(_)) => {
                    return Err(MarketError::ConflictRetry(record.key()));
                }
            }
        }
        Ok(())
    }
}
