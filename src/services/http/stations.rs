use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::models::stations::{Station, StationInput, StationStatus};
use crate::services::call;
use crate::services::stations::{StationFilter, StationRequest};

#[derive(Debug, Deserialize)]
pub struct StationQuery {
    pub q: Option<String>,
    pub status: Option<StationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: StationStatus,
}

pub async fn list_stations(
    State(state): State<AppState>,
    Query(params): Query<StationQuery>,
) -> ApiResult<Json<Vec<Station>>> {
    let filter = StationFilter {
        query: params.q,
        status: params.status,
    };

    let stations = call(&state.channels.stations, |response| {
        StationRequest::ListStations { filter, response }
    })
    .await?;

    Ok(Json(stations))
}

pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Station>> {
    let station = call(&state.channels.stations, |response| {
        StationRequest::GetStation { id, response }
    })
    .await?;

    Ok(Json(station))
}

pub async fn create_station(
    State(state): State<AppState>,
    Json(station): Json<StationInput>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let station = call(&state.channels.stations, |response| {
        StationRequest::CreateStation { station, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(station): Json<StationInput>,
) -> ApiResult<Json<Station>> {
    let station = call(&state.channels.stations, |response| {
        StationRequest::UpdateStation {
            id,
            station,
            response,
        }
    })
    .await?;

    Ok(Json(station))
}

pub async fn set_station_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Station>> {
    let station = call(&state.channels.stations, |response| StationRequest::SetStatus {
        id,
        status: body.status,
        response,
    })
    .await?;

    Ok(Json(station))
}

pub async fn toggle_station_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Station>> {
    let station = call(&state.channels.stations, |response| {
        StationRequest::ToggleStatus { id, response }
    })
    .await?;

    Ok(Json(station))
}

pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    call(&state.channels.stations, |response| {
        StationRequest::DeleteStation { id, response }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
