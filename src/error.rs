use crate::domain::ids::{BookId, RequestId, UserId};
use crate::domain::record::EntityKind;
use thiserror::Error;

/// Every failure a workflow operation can report to its caller.
///
/// All variants are recoverable: they describe why one request was refused and
/// never leave the store half-written.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },
    #[error("book {book} is not available for {action}")]
    NotAvailable { book: BookId, action: &'static str },
    #[error("user {actor} cannot {action} their own book {book}")]
    SelfTransactionDenied {
        actor: UserId,
        book: BookId,
        action: &'static str,
    },
    #[error("user {actor} already has a live {action} request on book {book}")]
    DuplicateRequest {
        actor: UserId,
        book: BookId,
        action: &'static str,
    },
    #[error("user {actor} is not allowed to {action} {request}")]
    Forbidden {
        actor: UserId,
        request: RequestId,
        action: &'static str,
    },
    #[error("user {actor} does not own book {book}")]
    NotOwner { actor: UserId, book: BookId },
    #[error("{request} is {status}, cannot {action}")]
    InvalidState {
        request: RequestId,
        status: &'static str,
        action: &'static str,
    },
    #[error("rental period must end after it starts")]
    InvalidRange,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Conflicting concurrent update on {0}, retry the operation")]
    ConflictRetry(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarketError {
    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Only optimistic-concurrency losses are worth replaying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictRetry(_))
    }

    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::StoreUnavailable(Box::new(err))
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::store(err)
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::RentalId;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(MarketError::ConflictRetry("book 1".into()).is_retryable());
        assert!(!MarketError::InvalidRange.is_retryable());
        assert!(!MarketError::not_found(EntityKind::Book, 1u64).is_retryable());
    }

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = MarketError::InvalidState {
            request: RequestId::Rental(RentalId::new(3)),
            status: "REJECTED",
            action: "approve",
        };
        assert_eq!(err.to_string(), "rental 3 is REJECTED, cannot approve");

        let err = MarketError::not_found(EntityKind::Purchase, 9u64);
        assert_eq!(err.to_string(), "purchase 9 not found");
    }
}
