//! Storage Layer
//!
//! SQLite persistence for station readings and station display names.
//! Writes are serialized through a single application-level lock; reads
//! go straight to the pool.

mod repository;
mod schema;

pub use repository::{Reading, ReadingStore, StoreConfig, DEFAULT_STATION_NAME};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cannot open database: {0}")]
    OpenError(String),
    #[error("Cannot ensure schema: {0}")]
    SchemaError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}
