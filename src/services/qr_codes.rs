use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::feed::ChangeFeed;
use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::events::{ChangeAction, Collection};
use crate::models::qr_codes::{QrCode, QrCodeInput, QrCodeView, QrPayload, QrStatus};
use crate::models::stations::Station;
use crate::repositories::{Datastore, QrCodeRepository, StationRepository};
use crate::utils::{generate_qr_png, generate_qr_svg};

#[derive(Clone, Debug, Default)]
pub struct QrCodeFilter {
    pub station_id: Option<String>,
    pub status: Option<QrStatus>,
}

/// What the generate form shows before anything is saved.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPreview {
    pub payload: QrPayload,
    pub encoded: String,
    pub svg: String,
}

#[derive(Clone, Debug)]
pub struct QrImage {
    pub file_name: String,
    pub png: Vec<u8>,
}

pub enum QrCodeRequest {
    ListQrCodes {
        filter: QrCodeFilter,
        response: Reply<Vec<QrCodeView>>,
    },
    PreviewPayload {
        input: QrCodeInput,
        response: Reply<QrPreview>,
    },
    CreateQrCode {
        input: QrCodeInput,
        response: Reply<QrCodeView>,
    },
    GetPayload {
        id: String,
        response: Reply<QrPayload>,
    },
    RenderSvg {
        id: String,
        response: Reply<String>,
    },
    RenderPng {
        id: String,
        response: Reply<QrImage>,
    },
    ToggleStatus {
        id: String,
        response: Reply<QrCode>,
    },
    DeleteQrCode {
        id: String,
        response: Reply<()>,
    },
}

fn qr_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("qr code not found: {}", id))
}

fn encode(payload: &QrPayload) -> Result<String, ServiceError> {
    payload
        .encode()
        .map_err(|e| ServiceError::Internal(format!("Failed to encode QR payload: {}", e)))
}

#[derive(Clone)]
pub struct QrCodeRequestHandler {
    store: Arc<dyn Datastore>,
    feed: ChangeFeed,
    size: u32,
}

impl QrCodeRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, feed: ChangeFeed, size: u32) -> Self {
        QrCodeRequestHandler { store, feed, size }
    }

    async fn station(&self, id: &str) -> Result<Station, ServiceError> {
        self.store
            .get_station(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("station not found: {}", id)))
    }

    async fn code_with_payload(&self, id: &str) -> Result<(QrCode, QrPayload), ServiceError> {
        let code = self
            .store
            .get_qr_code(id)
            .await?
            .ok_or_else(|| qr_not_found(id))?;
        let station = self.station(&code.station_id).await?;
        let payload = QrPayload::for_code(&code, &station);

        Ok((code, payload))
    }

    async fn list_qr_codes(&self, filter: QrCodeFilter) -> Result<Vec<QrCodeView>, ServiceError> {
        let stations: HashMap<String, String> = self
            .store
            .list_stations()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(self
            .store
            .list_qr_codes()
            .await?
            .into_iter()
            .filter(|code| {
                filter
                    .station_id
                    .as_ref()
                    .map_or(true, |id| &code.station_id == id)
            })
            .filter(|code| filter.status.map_or(true, |status| code.status == status))
            .map(|code| {
                let station_name = stations.get(&code.station_id).cloned();
                QrCodeView {
                    qr_code: code,
                    station_name,
                }
            })
            .collect())
    }

    async fn preview(&self, input: QrCodeInput) -> Result<QrPreview, ServiceError> {
        input.validate()?;
        let station = self.station(&input.station_id).await?;
        let resolved = input.resolve(&station)?;

        let payload = QrPayload::new(
            &station,
            &resolved.pump_id,
            resolved.fuel_type,
            resolved.price_per_liter,
        );
        let encoded = encode(&payload)?;
        let svg = generate_qr_svg(&encoded, self.size)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(QrPreview {
            payload,
            encoded,
            svg,
        })
    }

    async fn create_qr_code(&self, input: QrCodeInput) -> Result<QrCodeView, ServiceError> {
        input.validate()?;
        let station = self.station(&input.station_id).await?;
        let new_code = input.resolve(&station)?;

        let code = self.store.insert_qr_code(&new_code).await?;
        log::info!(
            "Generated QR code {} for {} pump {}",
            code.id,
            station.name,
            code.pump_id
        );
        self.feed
            .publish(Collection::QrCodes, &code.id, ChangeAction::Created);

        Ok(QrCodeView {
            qr_code: code,
            station_name: Some(station.name),
        })
    }

    async fn payload(&self, id: &str) -> Result<QrPayload, ServiceError> {
        let (_, payload) = self.code_with_payload(id).await?;
        Ok(payload)
    }

    async fn render_svg(&self, id: &str) -> Result<String, ServiceError> {
        let (_, payload) = self.code_with_payload(id).await?;

        generate_qr_svg(&encode(&payload)?, self.size)
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    async fn render_png(&self, id: &str) -> Result<QrImage, ServiceError> {
        let (code, payload) = self.code_with_payload(id).await?;
        let png = generate_qr_png(&encode(&payload)?, self.size)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(QrImage {
            file_name: format!("qrcode-{}.png", code.pump_id),
            png,
        })
    }

    async fn toggle_status(&self, id: &str) -> Result<QrCode, ServiceError> {
        let code = self
            .store
            .toggle_qr_status(id)
            .await?
            .ok_or_else(|| qr_not_found(id))?;
        log::info!("QR code {} is now {}", code.id, code.status);
        self.feed
            .publish(Collection::QrCodes, &code.id, ChangeAction::Updated);

        Ok(code)
    }

    async fn delete_qr_code(&self, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_qr_code(id).await? {
            return Err(qr_not_found(id));
        }
        log::info!("Deleted QR code {}", id);
        self.feed
            .publish(Collection::QrCodes, id, ChangeAction::Deleted);

        Ok(())
    }
}

#[async_trait]
impl RequestHandler<QrCodeRequest> for QrCodeRequestHandler {
    async fn handle_request(&self, request: QrCodeRequest) {
        match request {
            QrCodeRequest::ListQrCodes { filter, response } => {
                let codes = self.list_qr_codes(filter).await;
                respond("list qr codes", response, codes);
            }
            QrCodeRequest::PreviewPayload { input, response } => {
                let preview = self.preview(input).await;
                respond("preview qr code", response, preview);
            }
            QrCodeRequest::CreateQrCode { input, response } => {
                let code = self.create_qr_code(input).await;
                respond("create qr code", response, code);
            }
            QrCodeRequest::GetPayload { id, response } => {
                let payload = self.payload(&id).await;
                respond("get qr payload", response, payload);
            }
            QrCodeRequest::RenderSvg { id, response } => {
                let svg = self.render_svg(&id).await;
                respond("render qr svg", response, svg);
            }
            QrCodeRequest::RenderPng { id, response } => {
                let png = self.render_png(&id).await;
                respond("render qr png", response, png);
            }
            QrCodeRequest::ToggleStatus { id, response } => {
                let code = self.toggle_status(&id).await;
                respond("toggle qr status", response, code);
            }
            QrCodeRequest::DeleteQrCode { id, response } => {
                let result = self.delete_qr_code(&id).await;
                respond("delete qr code", response, result);
            }
        }
    }
}

pub struct QrCodeService;

impl QrCodeService {
    pub fn new() -> Self {
        QrCodeService {}
    }
}

#[async_trait]
impl Service<QrCodeRequest, QrCodeRequestHandler> for QrCodeService {}
