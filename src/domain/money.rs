use crate::error::MarketError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative monetary value.
///
/// Wraps `rust_decimal::Decimal` so that a negative price can never reach a
/// book or a request snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, MarketError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(MarketError::ValidationError(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rental cost: daily rate times billed days.
    pub fn for_days(self, days: u32) -> Result<Self, MarketError> {
        self.0
            .checked_mul(Decimal::from(days))
            .map(Self)
            .ok_or_else(|| {
                MarketError::ValidationError(format!(
                    "Rental price overflows for {days} days at {} per day",
                    self.0
                ))
            })
    }
}

impl TryFrom<Decimal> for Price {
    type Error = MarketError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}


/// What a book costs to rent per day and to buy outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub price_per_day: Price,
    pub price: Price,
}

impl Pricing {
    pub fn new(price_per_day: Decimal, price: Decimal) -> Result<Self, MarketError> {
        Ok(Self {
            price_per_day: Price::new(price_per_day)?,
            price: Price::new(price)?,
        })
    }
}
