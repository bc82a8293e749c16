use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::feed::ChangeFeed;
use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::events::{ChangeAction, Collection};
use crate::models::qr_codes::QrStatus;
use crate::models::stations::{FuelType, Station};
use crate::models::transactions::{
    fuel_amount, NewPurchase, Purchase, PurchaseRequest, Transaction, TransactionKind,
    TransactionStatus, TransactionView,
};
use crate::models::users::User;
use crate::repositories::{
    Datastore, QrCodeRepository, StationRepository, TransactionRepository, UserRepository,
};
use crate::utils::{paginate, Page, Paged};

#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub query: Option<String>,
    pub status: Option<TransactionStatus>,
    pub kind: Option<TransactionKind>,
    pub page: Page,
}

impl TransactionFilter {
    fn admits(&self, transaction: &Transaction) -> bool {
        self.status.map_or(true, |status| transaction.status == status)
            && self.kind.map_or(true, |kind| transaction.kind == kind)
    }
}

pub enum TransactionRequest {
    ListTransactions {
        filter: TransactionFilter,
        response: Reply<Paged<TransactionView>>,
    },
    GetTransaction {
        id: String,
        response: Reply<TransactionView>,
    },
    RecordPurchase {
        purchase: PurchaseRequest,
        response: Reply<Purchase>,
    },
}

fn generate_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("TRX-{}", id[..8].to_uppercase())
}

/// Where a purchase gets its station, fuel and price from.
struct PriceSource {
    station: Station,
    fuel_type: FuelType,
    price_per_liter: i64,
    qr_code_id: Option<String>,
}

#[derive(Clone)]
pub struct TransactionRequestHandler {
    store: Arc<dyn Datastore>,
    feed: ChangeFeed,
}

impl TransactionRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, feed: ChangeFeed) -> Self {
        TransactionRequestHandler { store, feed }
    }

    fn view(
        &self,
        transaction: Transaction,
        users: &HashMap<String, User>,
        stations: &HashMap<String, String>,
    ) -> TransactionView {
        let station_name = transaction
            .station_id
            .as_ref()
            .and_then(|id| stations.get(id))
            .cloned();
        let user = users.get(&transaction.user_id);

        TransactionView::new(transaction, user, station_name)
    }

    async fn lookups(
        &self,
    ) -> Result<(HashMap<String, User>, HashMap<String, String>), ServiceError> {
        let users = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let stations = self
            .store
            .list_stations()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok((users, stations))
    }

    async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Paged<TransactionView>, ServiceError> {
        let (users, stations) = self.lookups().await?;
        let query = filter.query.clone().unwrap_or_default();

        let views = self
            .store
            .list_transactions()
            .await?
            .into_iter()
            .filter(|t| filter.admits(t))
            .map(|t| self.view(t, &users, &stations))
            .filter(|view| view.matches(&query))
            .collect();

        Ok(paginate(views, filter.page))
    }

    async fn get_transaction(&self, id: &str) -> Result<TransactionView, ServiceError> {
        let transaction = self
            .store
            .get_transaction(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("transaction not found: {}", id)))?;
        let (users, stations) = self.lookups().await?;

        Ok(self.view(transaction, &users, &stations))
    }

    async fn active_station(&self, id: &str) -> Result<Station, ServiceError> {
        let station = self
            .store
            .get_station(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("station not found: {}", id)))?;
        if !station.is_active() {
            return Err(ServiceError::Conflict(format!(
                "station {} is {}",
                station.name, station.status
            )));
        }

        Ok(station)
    }

    async fn price_source(&self, request: &PurchaseRequest) -> Result<PriceSource, ServiceError> {
        if let Some(qr_code_id) = &request.qr_code_id {
            let code = self
                .store
                .get_qr_code(qr_code_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("qr code not found: {}", qr_code_id)))?;
            if code.status != QrStatus::Active {
                return Err(ServiceError::Conflict(format!(
                    "QR code for pump {} is inactive",
                    code.pump_id
                )));
            }
            let station = self.active_station(&code.station_id).await?;

            return Ok(PriceSource {
                station,
                fuel_type: code.fuel_type,
                price_per_liter: code.price_per_liter,
                qr_code_id: Some(code.id),
            });
        }

        let (Some(station_id), Some(fuel_type)) = (&request.station_id, request.fuel_type) else {
            return Err(ServiceError::Invalid(
                "either qrCodeId or stationId with fuelType is required".to_string(),
            ));
        };
        let station = self.active_station(station_id).await?;
        let price_per_liter = station.price_for(fuel_type);
        if price_per_liter <= 0 {
            return Err(ServiceError::Invalid(format!(
                "station {} does not sell {}",
                station.name, fuel_type
            )));
        }

        Ok(PriceSource {
            station,
            fuel_type,
            price_per_liter,
            qr_code_id: None,
        })
    }

    async fn record_purchase(&self, request: PurchaseRequest) -> Result<Purchase, ServiceError> {
        request.validate()?;
        let source = self.price_source(&request).await?;

        let amount = fuel_amount(request.liters, source.price_per_liter);
        if amount <= 0 {
            return Err(ServiceError::Invalid(format!(
                "{}L at {} per liter rounds to a zero charge",
                request.liters, source.price_per_liter
            )));
        }

        let purchase = NewPurchase {
            user_id: request.user_id.clone(),
            station_id: source.station.id.clone(),
            fuel_type: source.fuel_type,
            liters: request.liters,
            price_per_liter: source.price_per_liter,
            amount,
            reference: generate_reference(),
            qr_code_id: source.qr_code_id,
        };

        let result = self.store.record_purchase(&purchase).await?;
        log::info!(
            "User {} bought {}L of {} at {} for {}",
            result.user.id,
            purchase.liters,
            purchase.fuel_type,
            source.station.name,
            purchase.amount
        );

        self.feed.publish(
            Collection::Transactions,
            &result.transaction.id,
            ChangeAction::Created,
        );
        self.feed
            .publish(Collection::Users, &result.user.id, ChangeAction::Updated);
        if let Some(qr_code_id) = &purchase.qr_code_id {
            self.feed
                .publish(Collection::QrCodes, qr_code_id, ChangeAction::Updated);
        }

        Ok(result)
    }
}

#[async_trait]
impl RequestHandler<TransactionRequest> for TransactionRequestHandler {
    async fn handle_request(&self, request: TransactionRequest) {
        match request {
            TransactionRequest::ListTransactions { filter, response } => {
                let transactions = self.list_transactions(filter).await;
                respond("list transactions", response, transactions);
            }
            TransactionRequest::GetTransaction { id, response } => {
                let transaction = self.get_transaction(&id).await;
                respond("get transaction", response, transaction);
            }
            TransactionRequest::RecordPurchase { purchase, response } => {
                let purchase = self.record_purchase(purchase).await;
                respond("record purchase", response, purchase);
            }
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    pub fn new() -> Self {
        TransactionService {}
    }
}

#[async_trait]
impl Service<TransactionRequest, TransactionRequestHandler> for TransactionService {}
