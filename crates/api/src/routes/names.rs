//! Station Name Routes

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use data_validator::NameParams;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Echo of an updated station name
#[derive(Debug, Serialize, PartialEq)]
pub struct NameResponse {
    pub stationid: String,
    pub name: String,
}

/// Display name of every reporting station
pub async fn get_names(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.store.get_station_names().await?))
}

/// Set the display name of a station.
///
/// Fields come from a JSON body when one is sent, otherwise from the query.
pub async fn set_name(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NameParams>, QueryRejection>,
    body: Option<Json<NameParams>>,
) -> Result<(StatusCode, Json<NameResponse>), ApiError> {
    let params = match body {
        Some(Json(body)) => body,
        None => query?.0,
    };
    let valid = state.validator.validate_name(&params)?;

    state.store.update_name(&valid.station_id, &valid.name).await?;
    info!("updated: id={} name={}", valid.station_id, valid.name);

    Ok((
        StatusCode::CREATED,
        Json(NameResponse {
            stationid: valid.station_id,
            name: valid.name,
        }),
    ))
}
