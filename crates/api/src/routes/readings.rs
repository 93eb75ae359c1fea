//! Reading Routes

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use data_validator::ReadingParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;
use storage::Reading;

/// How far back the reading queries look
pub const LOOKBACK_HOURS: i64 = 24;

/// Query parameters for the per-station readings endpoint
#[derive(Debug, Deserialize)]
pub struct StationQuery {
    pub id: Option<String>,
}

/// Confirmation of a stored reading
#[derive(Debug, Serialize, PartialEq)]
pub struct StoredReading {
    pub station_id: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
}

/// Store one reading and update the station's gauges
pub async fn store_reading(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReadingParams>, QueryRejection>,
) -> Result<Json<StoredReading>, ApiError> {
    let Query(params) = query?;
    let valid = state
        .validator
        .validate_reading(&params, state.settings.multi_station)?;

    let reading = state
        .store
        .save_reading(valid.temperature, valid.humidity, valid.station_id.as_deref())
        .await?;

    info!(
        "stored reading: id={} temp={:.1} hum={:.1}",
        reading.station_id.as_deref().unwrap_or("-"),
        reading.temperature,
        reading.humidity
    );

    state.sink.record_reading(
        reading.station_id.as_deref(),
        reading.temperature,
        reading.humidity,
    );

    Ok(Json(StoredReading {
        station_id: reading.station_id,
        temperature: reading.temperature,
        humidity: reading.humidity,
    }))
}

/// Readings of one station over the look-back window
pub async fn get_readings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StationQuery>, QueryRejection>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let Query(params) = query?;
    let station_id = state
        .validator
        .validate_station_id(&params.id, state.settings.multi_station)?;

    let since = Utc::now() - Duration::hours(LOOKBACK_HOURS);
    let readings = state
        .store
        .get_readings_since(since, station_id.as_deref())
        .await?;

    Ok(Json(readings))
}

/// Readings of every station over the look-back window
pub async fn get_all_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<Reading>>>, ApiError> {
    let since = Utc::now() - Duration::hours(LOOKBACK_HOURS);
    Ok(Json(state.store.get_all_readings_since(since).await?))
}
