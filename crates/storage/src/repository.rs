//! Reading Store Implementation

use crate::schema::ensure_schema;
use crate::StorageError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Display name for stations that never registered one
pub const DEFAULT_STATION_NAME: &str = "Unknown";

/// One timestamped sample from a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station_id: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    stationid: Option<String>,
    temperature: f64,
    humidity: f64,
    timestamp_ms: i64,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = StorageError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(Reading {
            station_id: row.stationid,
            temperature: row.temperature,
            humidity: row.humidity,
            timestamp: from_millis(row.timestamp_ms)?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::DatabaseError(format!("Invalid timestamp: {}", ms)))
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the database file, created if missing
    pub path: String,
    /// Pool size
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "readings.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Durable store for readings and station names
pub struct ReadingStore {
    pool: SqlitePool,
    /// Write-exclusive section. Holds the last timestamp handed out so that
    /// timestamps never go backwards in insert order.
    write_lock: Mutex<i64>,
}

impl ReadingStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub async fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        info!("Opening reading store at {}", config.path);

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::OpenError(e.to_string()))?;

        Self::with_pool(pool).await
    }

    /// Open a private in-memory store.
    ///
    /// Every SQLite connection to `:memory:` is a separate database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::OpenError(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::OpenError(e.to_string()))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        ensure_schema(&pool).await?;
        Ok(Self {
            pool,
            write_lock: Mutex::new(i64::MIN),
        })
    }

    /// Store one reading, stamped with the store's clock.
    pub async fn save_reading(
        &self,
        temperature: f64,
        humidity: f64,
        station_id: Option<&str>,
    ) -> Result<Reading, StorageError> {
        let mut last_ms = self.write_lock.lock().await;

        let timestamp_ms = Utc::now().timestamp_millis().max(*last_ms);

        sqlx::query(
            "INSERT INTO readings (stationid, temperature, humidity, timestamp_ms) VALUES (?, ?, ?, ?)",
        )
        .bind(station_id)
        .bind(temperature)
        .bind(humidity)
        .bind(timestamp_ms)
        .execute(&self.pool)
        .await?;

        *last_ms = timestamp_ms;
        drop(last_ms);

        debug!(
            "Stored reading station={:?} temp={} hum={}",
            station_id, temperature, humidity
        );

        Ok(Reading {
            station_id: station_id.map(str::to_string),
            temperature,
            humidity,
            timestamp: from_millis(timestamp_ms)?,
        })
    }

    /// Readings at or after `since`, optionally restricted to one station.
    ///
    /// Rows come back in scan order; no sorting is applied.
    pub async fn get_readings_since(
        &self,
        since: DateTime<Utc>,
        station_id: Option<&str>,
    ) -> Result<Vec<Reading>, StorageError> {
        let since_ms = since.timestamp_millis();

        let rows: Vec<ReadingRow> = match station_id {
            Some(id) => {
                sqlx::query_as(
                    "SELECT stationid, temperature, humidity, timestamp_ms FROM readings \
                     WHERE timestamp_ms >= ? AND stationid = ?",
                )
                .bind(since_ms)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT stationid, temperature, humidity, timestamp_ms FROM readings \
                     WHERE timestamp_ms >= ?",
                )
                .bind(since_ms)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Reading::try_from).collect()
    }

    /// Every station id that has ever produced a reading.
    pub async fn get_distinct_stations(&self) -> Result<Vec<String>, StorageError> {
        let stations = sqlx::query_scalar(
            "SELECT DISTINCT stationid FROM readings WHERE stationid IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stations)
    }

    /// Readings at or after `since`, grouped per station.
    ///
    /// Stations that reported before the window still appear, with an
    /// empty list.
    pub async fn get_all_readings_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<BTreeMap<String, Vec<Reading>>, StorageError> {
        let mut grouped: BTreeMap<String, Vec<Reading>> = self
            .get_distinct_stations()
            .await?
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();

        for reading in self.get_readings_since(since, None).await? {
            if let Some(id) = reading.station_id.clone() {
                grouped.entry(id).or_default().push(reading);
            }
        }

        Ok(grouped)
    }

    /// Display name per reporting station, `"Unknown"` when unnamed.
    pub async fn get_station_names(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT DISTINCT r.stationid, COALESCE(n.name, ?) FROM readings r \
             LEFT JOIN stationidtoname n ON n.stationid = r.stationid \
             WHERE r.stationid IS NOT NULL",
        )
        .bind(DEFAULT_STATION_NAME)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Insert or replace the display name of a station.
    pub async fn update_name(&self, station_id: &str, name: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            "INSERT INTO stationidtoname (stationid, name) VALUES (?, ?) \
             ON CONFLICT (stationid) DO UPDATE SET name = excluded.name",
        )
        .bind(station_id)
        .bind(name)
        .execute(&self.pool)
        .await?;

        debug!("Station {} named {:?}", station_id, name);
        Ok(())
    }

    /// Total number of stored readings
    pub async fn reading_count(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool. Calling it again is a no-op.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            info!("Closing reading store");
            self.pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn day_ago() -> DateTime<Utc> {
        Utc::now() - Duration::hours(24)
    }

    #[tokio::test]
    async fn test_save_and_get_readings() {
        let store = ReadingStore::in_memory().await.unwrap();

        let saved = store.save_reading(21.5, 55.0, Some("kitchen")).await.unwrap();
        store.save_reading(18.0, 60.0, Some("garage")).await.unwrap();

        let readings = store.get_readings_since(day_ago(), Some("kitchen")).await.unwrap();
        assert_eq!(readings, vec![saved]);
        assert_eq!(readings[0].temperature, 21.5);
        assert_eq!(readings[0].humidity, 55.0);
    }

    #[tokio::test]
    async fn test_future_since_is_empty() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.save_reading(20.0, 40.0, Some("attic")).await.unwrap();

        let future = Utc::now() + Duration::hours(1);
        assert!(store.get_readings_since(future, Some("attic")).await.unwrap().is_empty());
        assert!(store.get_readings_since(future, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_query_includes_stationless_readings() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.save_reading(19.0, 45.0, None).await.unwrap();
        store.save_reading(20.0, 46.0, Some("porch")).await.unwrap();

        let readings = store.get_readings_since(day_ago(), None).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert!(readings.iter().any(|r| r.station_id.is_none()));

        // stationless readings are not a station
        assert_eq!(store.get_distinct_stations().await.unwrap(), vec!["porch".to_string()]);
    }

    #[tokio::test]
    async fn test_all_readings_covers_idle_stations() {
        let store = ReadingStore::in_memory().await.unwrap();

        // An old reading, outside any recent window
        sqlx::query(
            "INSERT INTO readings (stationid, temperature, humidity, timestamp_ms) VALUES (?, ?, ?, ?)",
        )
        .bind("cellar")
        .bind(12.0)
        .bind(80.0)
        .bind((Utc::now() - Duration::days(3)).timestamp_millis())
        .execute(&store.pool)
        .await
        .unwrap();

        store.save_reading(22.0, 50.0, Some("kitchen")).await.unwrap();
        store.save_reading(22.5, 51.0, Some("kitchen")).await.unwrap();

        let all = store.get_all_readings_since(day_ago()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["kitchen"].len(), 2);
        assert!(all["cellar"].is_empty());
    }

    #[tokio::test]
    async fn test_station_names_default_unknown() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.save_reading(21.0, 50.0, Some("A")).await.unwrap();
        store.save_reading(21.0, 50.0, Some("B")).await.unwrap();
        store.update_name("A", "Living room").await.unwrap();
        // named but never reported
        store.update_name("C", "Shed").await.unwrap();

        let names = store.get_station_names().await.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names["A"], "Living room");
        assert_eq!(names["B"], DEFAULT_STATION_NAME);
        assert!(!names.contains_key("C"));
    }

    #[tokio::test]
    async fn test_update_name_is_upsert() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.save_reading(21.0, 50.0, Some("A")).await.unwrap();

        store.update_name("A", "X").await.unwrap();
        store.update_name("A", "X").await.unwrap();
        assert_eq!(store.get_station_names().await.unwrap()["A"], "X");

        store.update_name("A", "Y").await.unwrap();
        assert_eq!(store.get_station_names().await.unwrap()["A"], "Y");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stationidtoname WHERE stationid = ?")
            .bind("A")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves() {
        let store = Arc::new(ReadingStore::in_memory().await.unwrap());

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let station = format!("station-{}", i % 7);
                    store
                        .save_reading(i as f64, 100.0 - i as f64, Some(station.as_str()))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.reading_count().await.unwrap(), 100);

        let readings = store.get_readings_since(day_ago(), None).await.unwrap();
        let mut temps: Vec<i64> = readings.iter().map(|r| r.temperature as i64).collect();
        temps.sort_unstable();
        assert_eq!(temps, (0..100).collect::<Vec<_>>());

        // timestamps follow insert order
        let stamps: Vec<i64> = sqlx::query_scalar("SELECT timestamp_ms FROM readings ORDER BY id")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.save_reading(1.0, 2.0, Some("x")).await.unwrap();

        ensure_schema(&store.pool).await.unwrap();
        assert_eq!(store.reading_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_close_twice() {
        let store = ReadingStore::in_memory().await.unwrap();
        store.close().await;
        store.close().await;
        assert!(store.reading_count().await.is_err());
    }

    fn file_config(name: &str) -> StoreConfig {
        let path = std::env::temp_dir().join(format!(
            "htcollector-{}-{}.db",
            std::process::id(),
            name
        ));
        remove_db_files(&path.to_string_lossy());
        StoreConfig {
            path: path.to_string_lossy().into_owned(),
            max_connections: 5,
        }
    }

    fn remove_db_files(path: &str) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path, suffix));
        }
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let config = file_config("reopen");

        let store = ReadingStore::open(&config).await.unwrap();
        store.save_reading(21.5, 55.0, Some("kitchen")).await.unwrap();
        store.update_name("kitchen", "Kitchen").await.unwrap();
        store.close().await;
        drop(store);

        let store = ReadingStore::open(&config).await.unwrap();
        assert_eq!(store.reading_count().await.unwrap(), 1);
        assert_eq!(store.get_station_names().await.unwrap()["kitchen"], "Kitchen");
        let readings = store.get_readings_since(day_ago(), Some("kitchen")).await.unwrap();
        assert_eq!(readings[0].temperature, 21.5);
        store.close().await;

        remove_db_files(&config.path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_concurrent_saves_and_reads() {
        let config = file_config("concurrent");
        let store = Arc::new(ReadingStore::open(&config).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..100 {
            let writer = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                writer
                    .save_reading(i as f64, 50.0, Some("s"))
                    .await
                    .map(|_| ())
            }));
            let reader = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                reader.get_readings_since(day_ago(), Some("s")).await.map(|_| ())
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.reading_count().await.unwrap(), 100);
        store.close().await;

        remove_db_files(&config.path);
    }

    #[tokio::test]
    async fn test_open_in_missing_directory_fails() {
        let config = StoreConfig {
            path: "/nonexistent_dir/readings.db".to_string(),
            ..Default::default()
        };

        let result = ReadingStore::open(&config).await;
        assert!(matches!(result, Err(StorageError::OpenError(_))));
    }
}
