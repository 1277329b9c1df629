use crate::application::command::Command;
use crate::domain::ids::{BookId, PurchaseId, RentalId, UserId};
use crate::domain::money::Pricing;
use crate::domain::review::Stars;
use crate::error::{MarketError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    ListBook,
    UpdatePrice,
    RequestRental,
    ApproveRental,
    RejectRental,
    ReturnBook,
    RequestPurchase,
    ApprovePurchase,
    RejectPurchase,
    Review,
}

/// One row of the command log.
///
/// Columns: `type, actor, book, request, days, price_per_day, price, rating,
/// text`. Columns a command does not use may be empty or missing.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub actor: u64,
    pub book: Option<u64>,
    pub request: Option<u64>,
    pub days: Option<u32>,
    pub price_per_day: Option<Decimal>,
    pub price: Option<Decimal>,
    pub rating: Option<u8>,
    pub text: Option<String>,
}

fn required<T>(value: Option<T>, column: &str, command: CommandType) -> Result<T> {
    value.ok_or_else(|| {
        MarketError::ValidationError(format!("{command:?} requires the '{column}' column"))
    })
}

impl CommandRecord {
    fn pricing(&self) -> Result<Pricing> {
        Pricing::new(
            required(self.price_per_day, "price_per_day", self.r#type)?,
            required(self.price, "price", self.r#type)?,
        )
    }

    fn book(&self) -> Result<BookId> {
        required(self.book, "book", self.r#type).map(BookId::new)
    }

    fn request(&self) -> Result<u64> {
        required(self.request, "request", self.r#type)
    }
}

impl TryFrom<CommandRecord> for Command {
    type Error = MarketError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let actor = UserId::new(record.actor);
        let command = match record.r#type {
            CommandType::ListBook => Command::ListBook {
                owner: actor,
                pricing: record.pricing()?,
                title: required(record.text, "text", record.r#type)?,
            },
            CommandType::UpdatePrice => Command::UpdatePrice {
                actor,
                book: record.book()?,
                pricing: record.pricing()?,
            },
            CommandType::RequestRental => Command::RequestRental {
                actor,
                book: record.book()?,
                days: record.days,
            },
            CommandType::ApproveRental => Command::ApproveRental {
                actor,
                rental: RentalId::new(record.request()?),
            },
            CommandType::RejectRental => Command::RejectRental {
                actor,
                rental: RentalId::new(record.request()?),
            },
            CommandType::ReturnBook => Command::ReturnBook {
                actor,
                rental: RentalId::new(record.request()?),
            },
            CommandType::RequestPurchase => Command::RequestPurchase {
                actor,
                book: record.book()?,
            },
            CommandType::ApprovePurchase => Command::ApprovePurchase {
                actor,
                purchase: PurchaseId::new(record.request()?),
            },
            CommandType::RejectPurchase => Command::RejectPurchase {
                actor,
                purchase: PurchaseId::new(record.request()?),
            },
            CommandType::Review => Command::Review {
                actor,
                book: record.book()?,
                rating: Stars::new(required(record.rating, "rating", record.r#type)?)?,
                body: record.text.unwrap_or_default(),
            },
        };
        Ok(command)
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows and turns each into a `Command`.
    ///
    /// A malformed row yields an `Err` item and does not end the stream.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(MarketError::from).and_then(Command::try_from))
    }
}
