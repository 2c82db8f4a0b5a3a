//! Unified error type for the savings ledger.
//!
//! Business rejections (`NotFound`, `InvalidArgument`, `Forbidden`,
//! `InsufficientBalance`, `Conflict`) are raised before any write and carry a
//! reason the calling layer can show as-is. Everything else is an
//! infrastructure failure and is reported to users generically.

use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A saver, transaction or withdrawal does not exist (or is soft-deleted).
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// Input failed validation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable reason
        message: String,
    },

    /// The actor's role does not allow the operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable reason
        message: String,
    },

    /// A withdrawal asked for more than the saver holds.
    #[error("Insufficient balance: saver has {balance}, withdrawal requires {required}")]
    InsufficientBalance {
        /// Balance at the time of the check
        balance: Decimal,
        /// Total the withdrawal needed
        required: Decimal,
    },

    /// Uniqueness violation or a lost optimistic-concurrency race.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// Failure reported by the storage layer.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Snapshot (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Whether this is a business rejection whose message can be shown to the user.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidArgument { .. }
                | Self::Forbidden { .. }
                | Self::InsufficientBalance { .. }
                | Self::Conflict { .. }
        )
    }

    /// Message suitable for the calling layer to render directly.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            "An internal error occurred. Please try again later.".to_string()
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
