use std::sync::Arc;

use async_trait::async_trait;

use super::feed::ChangeFeed;
use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::events::{ChangeAction, Collection};
use crate::models::stations::{Station, StationInput, StationStatus};
use crate::repositories::{Datastore, QrCodeRepository, StationRepository};

#[derive(Clone, Debug, Default)]
pub struct StationFilter {
    pub query: Option<String>,
    pub status: Option<StationStatus>,
}

pub enum StationRequest {
    ListStations {
        filter: StationFilter,
        response: Reply<Vec<Station>>,
    },
    GetStation {
        id: String,
        response: Reply<Station>,
    },
    CreateStation {
        station: StationInput,
        response: Reply<Station>,
    },
    UpdateStation {
        id: String,
        station: StationInput,
        response: Reply<Station>,
    },
    SetStatus {
        id: String,
        status: StationStatus,
        response: Reply<Station>,
    },
    ToggleStatus {
        id: String,
        response: Reply<Station>,
    },
    DeleteStation {
        id: String,
        response: Reply<()>,
    },
}

fn station_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("station not found: {}", id))
}

#[derive(Clone)]
pub struct StationRequestHandler {
    store: Arc<dyn Datastore>,
    feed: ChangeFeed,
}

impl StationRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, feed: ChangeFeed) -> Self {
        StationRequestHandler { store, feed }
    }

    async fn list_stations(&self, filter: StationFilter) -> Result<Vec<Station>, ServiceError> {
        let query = filter.query.unwrap_or_default();

        Ok(self
            .store
            .list_stations()
            .await?
            .into_iter()
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .filter(|s| s.matches(&query))
            .collect())
    }

    async fn get_station(&self, id: &str) -> Result<Station, ServiceError> {
        self.store
            .get_station(id)
            .await?
            .ok_or_else(|| station_not_found(id))
    }

    fn updated(&self, station: Station) -> Station {
        self.feed
            .publish(Collection::Stations, &station.id, ChangeAction::Updated);
        station
    }

    async fn create_station(&self, input: StationInput) -> Result<Station, ServiceError> {
        input.validate()?;

        let station = self.store.insert_station(&input).await?;
        log::info!("Added station {} in {}", station.name, station.city);
        self.feed
            .publish(Collection::Stations, &station.id, ChangeAction::Created);

        Ok(station)
    }

    async fn update_station(&self, id: &str, input: StationInput) -> Result<Station, ServiceError> {
        input.validate()?;

        let station = self
            .store
            .update_station(id, &input)
            .await?
            .ok_or_else(|| station_not_found(id))?;
        log::info!("Updated station {}", station.id);

        Ok(self.updated(station))
    }

    async fn set_status(&self, id: &str, status: StationStatus) -> Result<Station, ServiceError> {
        let station = self
            .store
            .set_station_status(id, status)
            .await?
            .ok_or_else(|| station_not_found(id))?;
        log::info!("Station {} is now {}", station.id, station.status);

        Ok(self.updated(station))
    }

    async fn toggle_status(&self, id: &str) -> Result<Station, ServiceError> {
        let station = self
            .store
            .toggle_station_status(id)
            .await?
            .ok_or_else(|| station_not_found(id))?;
        log::info!("Station {} toggled to {}", station.id, station.status);

        Ok(self.updated(station))
    }

    async fn delete_station(&self, id: &str) -> Result<(), ServiceError> {
        let codes: Vec<String> = self
            .store
            .list_qr_codes()
            .await?
            .into_iter()
            .filter(|code| code.station_id == id)
            .map(|code| code.id)
            .collect();

        if !self.store.delete_station(id).await? {
            return Err(station_not_found(id));
        }
        log::info!("Deleted station {} and {} QR codes", id, codes.len());

        self.feed
            .publish(Collection::Stations, id, ChangeAction::Deleted);
        for code in &codes {
            self.feed
                .publish(Collection::QrCodes, code, ChangeAction::Deleted);
        }

        Ok(())
    }
}

#[async_trait]
impl RequestHandler<StationRequest> for StationRequestHandler {
    async fn handle_request(&self, request: StationRequest) {
        match request {
            StationRequest::ListStations { filter, response } => {
                let stations = self.list_stations(filter).await;
                respond("list stations", response, stations);
            }
            StationRequest::GetStation { id, response } => {
                let station = self.get_station(&id).await;
                respond("get station", response, station);
            }
            StationRequest::CreateStation { station, response } => {
                let station = self.create_station(station).await;
                respond("create station", response, station);
            }
            StationRequest::UpdateStation {
                id,
                station,
                response,
            } => {
                let station = self.update_station(&id, station).await;
                respond("update station", response, station);
            }
            StationRequest::SetStatus {
                id,
                status,
                response,
            } => {
                let station = self.set_status(&id, status).await;
                respond("set station status", response, station);
            }
            StationRequest::ToggleStatus { id, response } => {
                let station = self.toggle_status(&id).await;
                respond("toggle station status", response, station);
            }
            StationRequest::DeleteStation { id, response } => {
                let result = self.delete_station(&id).await;
                respond("delete station", response, result);
            }
        }
    }
}

pub struct StationService;

impl StationService {
    pub fn new() -> Self {
        StationService {}
    }
}

#[async_trait]
impl Service<StationRequest, StationRequestHandler> for StationService {}
