//! Strongly-typed identifiers.
//!
//! Identifiers serialize as plain integers but accept either a JSON number or a
//! numeric string on the way in, so `"7"` and `7` name the same book.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_numeric(deserializer).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a listed book.
    BookId
);
define_id!(
    /// Identifier of a rental request.
    RentalId
);
define_id!(
    /// Identifier of a purchase request.
    PurchaseId
);
define_id!(
    /// Identifier of a review.
    ReviewId
);
define_id!(
    /// Authenticated user identifier supplied by the identity provider.
    UserId
);

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericRepr {
    Number(u64),
    Text(String),
}

fn deserialize_numeric<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumericRepr::deserialize(deserializer)? {
        NumericRepr::Number(n) => Ok(n),
        NumericRepr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Either kind of request a book owner can decide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestId {
    Rental(RentalId),
    Purchase(PurchaseId),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rental(id) => write!(f, "rental {id}"),
            Self::Purchase(id) => write!(f, "purchase {id}"),
        }
    }
}

impl From<RentalId> for RequestId {
    fn from(id: RentalId) -> Self {
        Self::Rental(id)
    }
}

impl From<PurchaseId> for RequestId {
    fn from(id: PurchaseId) -> Self {
        Self::Purchase(id)
    }
}
