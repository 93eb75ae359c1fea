//! Schema management
//!
//! Idempotent "create if missing" statements, applied once when the store
//! is opened.

use sqlx::SqlitePool;
use tracing::debug;

use crate::StorageError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS readings (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        stationid    TEXT,
        temperature  REAL    NOT NULL,
        humidity     REAL    NOT NULL,
        timestamp_ms INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings (timestamp_ms)",
    "CREATE INDEX IF NOT EXISTS idx_readings_stationid ON readings (stationid)",
    r#"
    CREATE TABLE IF NOT EXISTS stationidtoname (
        stationid TEXT NOT NULL PRIMARY KEY,
        name      TEXT NOT NULL
    )
    "#,
];

/// Create tables and indexes if they do not exist yet.
pub(crate) async fn ensure_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::SchemaError(e.to_string()))?;

    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::SchemaError(e.to_string()))?;
    }

    tx.commit()
        .await
        .map_err(|e| StorageError::SchemaError(e.to_string()))?;

    debug!("Schema ensured ({} statements)", STATEMENTS.len());
    Ok(())
}
