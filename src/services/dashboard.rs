use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::dashboard::{
    most_recent, DashboardDisplay, DashboardSnapshot, DashboardStats, RECENT_TRANSACTIONS,
};
use crate::models::transactions::TransactionView;
use crate::repositories::{
    Datastore, DepositRepository, QrCodeRepository, StationRepository, TransactionRepository,
    UserRepository,
};

pub enum DashboardRequest {
    GetSnapshot {
        response: Reply<DashboardSnapshot>,
    },
}

#[derive(Clone)]
pub struct DashboardRequestHandler {
    store: Arc<dyn Datastore>,
}

impl DashboardRequestHandler {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        DashboardRequestHandler { store }
    }

    async fn snapshot(&self) -> Result<DashboardSnapshot, ServiceError> {
        let users = self.store.list_users().await?;
        let transactions = self.store.list_transactions().await?;
        let stations = self.store.list_stations().await?;
        let qr_codes = self.store.list_qr_codes().await?;
        let deposits = self.store.list_deposits().await?;

        let stats = DashboardStats::compute(&users, &transactions, &stations, &qr_codes, &deposits);
        let display = DashboardDisplay::from(&stats);

        let users: HashMap<&str, _> = users.iter().map(|u| (u.id.as_str(), u)).collect();
        let station_names: HashMap<&str, &str> = stations
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();
        let recent_transactions = most_recent(&transactions, RECENT_TRANSACTIONS)
            .into_iter()
            .map(|t| {
                let user = users.get(t.user_id.as_str()).copied();
                let station_name = t
                    .station_id
                    .as_deref()
                    .and_then(|id| station_names.get(id))
                    .map(|name| name.to_string());
                TransactionView::new(t, user, station_name)
            })
            .collect();

        Ok(DashboardSnapshot {
            stats,
            display,
            recent_transactions,
        })
    }
}

#[async_trait]
impl RequestHandler<DashboardRequest> for DashboardRequestHandler {
    async fn handle_request(&self, request: DashboardRequest) {
        match request {
            DashboardRequest::GetSnapshot { response } => {
                let snapshot = self.snapshot().await;
                respond("dashboard snapshot", response, snapshot);
            }
        }
    }
}

pub struct DashboardService;

impl DashboardService {
    pub fn new() -> Self {
        DashboardService {}
    }
}

#[async_trait]
impl Service<DashboardRequest, DashboardRequestHandler> for DashboardService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::seed::seed_demo_data;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn snapshot_of_demo_data() {
        let store = Arc::new(MemoryStore::new());
        seed_demo_data(store.as_ref()).await.unwrap();
        let handler = DashboardRequestHandler::new(store);

        let snapshot = handler.snapshot().await.unwrap();

        assert_eq!(snapshot.stats.total_users, 3);
        assert_eq!(snapshot.stats.active_users, 2);
        assert_eq!(snapshot.stats.total_revenue, 4_500);
        assert_eq!(snapshot.stats.pending_deposits, 1);
        assert_eq!(snapshot.stats.total_stations, 2);
        assert_eq!(snapshot.display.revenue, "₦4,500");
        assert_eq!(snapshot.display.fuel_volume, "25L");
        assert_eq!(snapshot.display.active_users, "2 active");
        assert_eq!(snapshot.recent_transactions.len(), 4);
    }
}
