use crate::domain::availability::BookState;
use crate::domain::book::Book;
use crate::domain::purchase::PurchaseRequest;
use crate::domain::rental::RentalRequest;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One line of the books report.
#[derive(Debug, Serialize, PartialEq)]
pub struct BookRow {
    pub book: u64,
    pub owner: u64,
    pub title: String,
    pub rentable: bool,
    pub purchasable: bool,
    pub price_per_day: Decimal,
    pub price: Decimal,
    pub rating: Decimal,
    pub total_ratings: u32,
    pub state: &'static str,
}

impl BookRow {
    pub fn new(book: &Book, state: BookState) -> Self {
        Self {
            book: book.id.value(),
            owner: book.owner_id.value(),
            title: book.title.clone(),
            rentable: book.rentable,
            purchasable: book.purchasable,
            price_per_day: book.pricing.price_per_day.value().normalize(),
            price: book.pricing.price.value().normalize(),
            rating: book.rating.mean.normalize(),
            total_ratings: book.rating.count,
            state: state.as_str(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RentalRow {
    pub rental: u64,
    pub book: u64,
    pub renter: u64,
    pub status: &'static str,
    pub start: String,
    pub end: String,
    pub total_price: Decimal,
    pub owner_approval: bool,
    pub return_date: Option<String>,
}

impl From<&RentalRequest> for RentalRow {
    fn from(rental: &RentalRequest) -> Self {
        Self {
            rental: rental.id.value(),
            book: rental.book_id.value(),
            renter: rental.renter_id.value(),
            status: rental.status.as_str(),
            start: rental.period.start().to_rfc3339(),
            end: rental.period.end().to_rfc3339(),
            total_price: rental.total_price.value().normalize(),
            owner_approval: rental.owner_approval,
            return_date: rental.return_date.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PurchaseRow {
    pub purchase: u64,
    pub book: u64,
    pub buyer: u64,
    pub status: &'static str,
    pub price: Decimal,
    pub owner_approval: bool,
}

impl From<&PurchaseRequest> for PurchaseRow {
    fn from(purchase: &PurchaseRequest) -> Self {
        Self {
            purchase: purchase.id.value(),
            book: purchase.book_id.value(),
            buyer: purchase.buyer_id.value(),
            status: purchase.status.as_str(),
            price: purchase.price.value().normalize(),
            owner_approval: purchase.owner_approval,
        }
    }
}

/// Writes report rows as CSV with a header line.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_books<'a, I>(&mut self, books: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a Book, BookState)>,
    {
        self.write_rows(books.into_iter().map(|(book, state)| BookRow::new(book, state)))
    }

    pub fn write_rentals(&mut self, rentals: &[RentalRequest]) -> Result<()> {
        self.write_rows(rentals.iter().map(RentalRow::from))
    }

    pub fn write_purchases(&mut self, purchases: &[PurchaseRequest]) -> Result<()> {
        self.write_rows(purchases.iter().map(PurchaseRow::from))
    }

    fn write_rows<T: Serialize>(&mut self, rows: impl Iterator<Item = T>) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| std::io::Error::other(err.to_string()).into())
    }
}
