//! Error types shared by the stores, the market client and the notifier

use thiserror::Error;

/// An alert field that violates its invariant. The store is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("target price must be a positive number, got {0}")]
    NonPositivePrice(f64),
    #[error("resource id must not be negative, got {0}")]
    NegativeResource(i64),
    #[error("quality must be between 0 and 12, got {0}")]
    QualityOutOfRange(i64),
    #[error("label must not be empty")]
    EmptyLabel,
    #[error("unknown field '{0}', expected price, quality or label")]
    UnknownField(String),
    #[error("{field} must be a number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no alert with id {0}")]
    NotFound(i64),
    #[error("this operation requires elevated privileges")]
    PermissionDenied,
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Failure to obtain a market snapshot. An empty result is not an error.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("market request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("market API answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("market request timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("recipient '{0}' is not a valid chat id")]
    InvalidRecipient(String),
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("message delivery timed out")]
    Timeout,
}

/// Failure while answering a bot command.
#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Why a single id of a batch delete was not deleted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRejection {
    #[error("no such alert")]
    NotFound,
    #[error("alert belongs to another chat")]
    NotOwner,
    #[error("more than {0} ids in one request")]
    OverBatchLimit(usize),
}
