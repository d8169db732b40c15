//! # Database Error Types
//!
//! Error types for database operations and the Order Engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Business rule (CoreError)       SQLite Error (sqlx::Error)            │
//! │       │                                │                                │
//! │       └──────────────┬─────────────────┘                                │
//! │                      ▼                                                  │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorReport { kind, class, message } ← Serialized for the shell       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{CoreError, ErrorClass, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and business rule violations raised while
/// a transaction is open.
#[derive(Debug, Error)]
pub enum DbError {
    /// Business rule violation detected inside an operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Row missing where one was required.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - A row vanished between read and write
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate phone number
    /// - Duplicate category name
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns the machine-checkable code for this error.
    ///
    /// Everything that isn't a business rule violation is `PERSISTENCE`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Core(err) => err.kind(),
            _ => ErrorKind::Persistence,
        }
    }

    /// Returns the taxonomy class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::Core(err) => err.class(),
            _ => ErrorClass::Persistence,
        }
    }

    /// Builds the serializable report the shell renders.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            class: self.class(),
            message: self.to_string(),
        }
    }
}

/// What a caller sees when an operation fails.
///
/// ## Serialization
/// ```json
/// {
///   "kind": "ORDER_NOT_DELETABLE",
///   "class": "STATE_CONFLICT",
///   "message": "Order 7f3c… is paid, only pending orders can be deleted"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub class: ErrorClass,
    pub message: String,
}

impl From<&DbError> for ErrorReport {
    fn from(err: &DbError) -> Self {
        err.report()
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Money;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: DbError = CoreError::OrderAlreadyPaid("o-1".to_string()).into();
        let report = err.report();

        assert_eq!(report.kind, ErrorKind::OrderAlreadyPaid);
        assert_eq!(report.class, ErrorClass::StateConflict);
        assert_eq!(report.message, "Order o-1 is already fully paid");
    }

    #[test]
    fn test_storage_errors_are_persistence() {
        let err = DbError::PoolExhausted;
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.class(), ErrorClass::Persistence);
    }

    #[test]
    fn test_report_serializes_for_the_shell() {
        let err: DbError = CoreError::InvalidPaymentAmount {
            amount: Money::from_cents(-100),
            remaining: Money::from_cents(500),
        }
        .into();

        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["kind"], "INVALID_PAYMENT_AMOUNT");
        assert_eq!(json["class"], "VALIDATION");
    }
}
