//! Error types for the record store.

use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to reach the store (pool exhaustion, transport failure).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store rejected the operation because of a contended lock.
    #[error("Contention error: {0}")]
    ContentionError(String),

    /// A statement failed for a non-transient reason.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Schema creation or teardown failed.
    #[error("Schema error: {0}")]
    SchemaError(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a contention error.
    pub fn contention(msg: impl Into<String>) -> Self {
        Self::ContentionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Whether retrying the failed unit of work from scratch can succeed.
    ///
    /// Connection hiccups and lock contention are transient; query and
    /// schema failures will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::ContentionError(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                // SQLite reports lock contention as SQLITE_BUSY or
                // SQLITE_LOCKED, both phrased around "locked".
                if message.to_lowercase().contains("locked") {
                    Self::ContentionError(message)
                } else {
                    Self::QueryError(message)
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::ConnectionError(err.to_string())
            }
            _ => Self::QueryError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(StoreError::connection("pool timed out").is_retryable());
        assert!(StoreError::contention("database is locked").is_retryable());
    }

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        assert!(!StoreError::query("no such table").is_retryable());
        assert!(!StoreError::schema("table exists").is_retryable());
    }
}
