use super::ids::{BookId, RentalId, UserId};
use super::money::Price;
use crate::error::MarketError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RentalStatus {
    Pending,
    Active,
    Rejected,
    Returned,
}

impl RentalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
            Self::Returned => "RETURNED",
        }
    }

    /// Pending and active rentals block a second request from the same renter.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// Half-open rental window `[start, end)`; always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RentalPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, MarketError> {
        if end <= start {
            return Err(MarketError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, days: u32) -> Result<Self, MarketError> {
        let end = Duration::try_days(i64::from(days))
            .and_then(|length| start.checked_add_signed(length))
            .ok_or(MarketError::InvalidRange)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Every started day is billed.
    pub fn billable_days(&self) -> u32 {
        let seconds = (self.end - self.start).num_seconds();
        let days = (seconds + 86_399) / 86_400;
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRequest {
    pub id: RentalId,
    pub book_id: BookId,
    pub renter_id: UserId,
    pub period: RentalPeriod,
    pub status: RentalStatus,
    pub owner_approval: bool,
    pub total_price: Price,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl RentalRequest {
    pub fn new(
        id: RentalId,
        book_id: BookId,
        renter_id: UserId,
        period: RentalPeriod,
        price_per_day: Price,
        now: DateTime<Utc>,
    ) -> Result<Self, MarketError> {
        Ok(Self {
            id,
            book_id,
            renter_id,
            period,
            status: RentalStatus::Pending,
            owner_approval: false,
            total_price: price_per_day.for_days(period.billable_days())?,
            return_date: None,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == RentalStatus::Active && self.period.end() < now
    }

    pub(crate) fn activate(&mut self, now: DateTime<Utc>) {
        self.status = RentalStatus::Active;
        self.owner_approval = true;
        self.touch(now);
    }

    pub(crate) fn reject(&mut self, now: DateTime<Utc>) {
        self.status = RentalStatus::Rejected;
        self.owner_approval = false;
        self.touch(now);
    }

    pub(crate) fn mark_returned(&mut self, now: DateTime<Utc>) {
        self.status = RentalStatus::Returned;
        self.return_date = Some(now);
        self.touch(now);
    }
}
