use super::ids::{BookId, ReviewId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 1 to 5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Stars(u8);

impl Stars {
    pub fn new(value: u8) -> Result<Self, MarketError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(MarketError::ValidationError(format!(
                "Rating must be between 1 and 5, got {value}"
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Stars {
    type Error = MarketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Stars {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub reviewer_id: UserId,
    pub rating: Stars,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Review {
    pub fn new(
        id: ReviewId,
        book_id: BookId,
        reviewer_id: UserId,
        rating: Stars,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            book_id,
            reviewer_id,
            rating,
            body: body.into(),
            created_at: now,
            version: 1,
        }
    }
}
