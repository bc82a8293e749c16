use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::models::qr_codes::{QrCode, QrCodeInput, QrCodeView, QrPayload, QrStatus};
use crate::services::call;
use crate::services::qr_codes::{QrCodeFilter, QrCodeRequest, QrPreview};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeQuery {
    pub station_id: Option<String>,
    pub status: Option<QrStatus>,
}

pub async fn list_qr_codes(
    State(state): State<AppState>,
    Query(params): Query<QrCodeQuery>,
) -> ApiResult<Json<Vec<QrCodeView>>> {
    let filter = QrCodeFilter {
        station_id: params.station_id,
        status: params.status,
    };

    let codes = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::ListQrCodes { filter, response }
    })
    .await?;

    Ok(Json(codes))
}

pub async fn preview_qr_code(
    State(state): State<AppState>,
    Json(input): Json<QrCodeInput>,
) -> ApiResult<Json<QrPreview>> {
    let preview = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::PreviewPayload { input, response }
    })
    .await?;

    Ok(Json(preview))
}

pub async fn create_qr_code(
    State(state): State<AppState>,
    Json(input): Json<QrCodeInput>,
) -> ApiResult<(StatusCode, Json<QrCodeView>)> {
    let code = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::CreateQrCode { input, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(code)))
}

pub async fn get_payload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QrPayload>> {
    let payload = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::GetPayload { id, response }
    })
    .await?;

    Ok(Json(payload))
}

pub async fn get_svg(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let svg = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::RenderSvg { id, response }
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

pub async fn get_png(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let image = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::RenderPng { id, response }
    })
    .await?;

    let disposition = format!("attachment; filename=\"{}\"", image.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        image.png,
    ))
}

pub async fn toggle_qr_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QrCode>> {
    let code = call(&state.channels.qr_codes, |response| {
        QrCodeRequest::ToggleStatus { id, response }
    })
    .await?;

    Ok(Json(code))
}

pub async fn delete_qr_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    call(&state.channels.qr_codes, |response| {
        QrCodeRequest::DeleteQrCode { id, response }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
