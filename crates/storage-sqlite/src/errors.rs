//! Storage errors for the SQLite medium.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Query failed
    #[error("Database query failed: {0}")]
    Diesel(#[from] diesel::result::Error),

    /// Could not open the database file
    #[error("Database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// Could not check a connection out of the pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// Data directory could not be prepared
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for leirad_core::Error {
    fn from(err: StorageError) -> Self {
        leirad_core::Error::Storage(err.to_string())
    }
}
