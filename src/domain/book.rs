use super::ids::{BookId, UserId};
use super::money::Pricing;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rolling review score of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingAggregate {
    /// Arithmetic mean of every rating, rounded to two decimal places.
    pub mean: Decimal,
    pub count: u32,
}

impl RatingAggregate {
    /// Recomputes the aggregate from the full set of ratings.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u32), |(sum, count), r| (sum + u64::from(r), count + 1));
        if count == 0 {
            return Self::default();
        }
        let mean = (Decimal::from(sum) / Decimal::from(count)).round_dp(2);
        Self { mean, count }
    }
}

/// A listed book and its cached availability flags.
///
/// `rentable` and `purchasable` are a projection of the book's requests; only
/// the availability state machine changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub owner_id: UserId,
    pub title: String,
    pub rentable: bool,
    pub purchasable: bool,
    pub pricing: Pricing,
    pub rating: RatingAggregate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Book {
    pub fn new(
        id: BookId,
        owner_id: UserId,
        title: impl Into<String>,
        pricing: Pricing,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            rentable: true,
            purchasable: true,
            pricing,
            rating: RatingAggregate::default(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Bumps the version; the store accepts the write only over the previous one.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub(crate) fn set_availability(&mut self, available: bool) {
        self.rentable = available;
        self.purchasable = available;
    }
}
