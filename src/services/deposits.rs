use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::feed::ChangeFeed;
use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::admins::AdminIdentity;
use crate::models::deposits::{
    DepositDecision, DepositStatus, DepositView, NewDeposit, Settlement,
};
use crate::models::events::{ChangeAction, Collection};
use crate::models::users::User;
use crate::repositories::{Datastore, DepositRepository, UserRepository};
use crate::utils::{paginate, Page, Paged};

#[derive(Clone, Debug, Default)]
pub struct DepositFilter {
    pub query: Option<String>,
    pub status: Option<DepositStatus>,
    pub page: Page,
}

pub enum DepositRequest {
    ListDeposits {
        filter: DepositFilter,
        response: Reply<Paged<DepositView>>,
    },
    GetDeposit {
        id: String,
        response: Reply<DepositView>,
    },
    CreateDeposit {
        deposit: NewDeposit,
        response: Reply<DepositView>,
    },
    ApproveDeposit {
        id: String,
        admin: AdminIdentity,
        response: Reply<Settlement>,
    },
    RejectDeposit {
        id: String,
        admin: AdminIdentity,
        response: Reply<Settlement>,
    },
}

fn generate_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("DEP-{}", id[..8].to_uppercase())
}

#[derive(Clone)]
pub struct DepositRequestHandler {
    store: Arc<dyn Datastore>,
    feed: ChangeFeed,
}

impl DepositRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, feed: ChangeFeed) -> Self {
        DepositRequestHandler { store, feed }
    }

    async fn users_by_id(&self) -> Result<HashMap<String, User>, ServiceError> {
        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    async fn list_deposits(
        &self,
        filter: DepositFilter,
    ) -> Result<Paged<DepositView>, ServiceError> {
        let users = self.users_by_id().await?;
        let query = filter.query.unwrap_or_default();

        let deposits = self
            .store
            .list_deposits()
            .await?
            .into_iter()
            .filter(|d| filter.status.map_or(true, |status| d.status == status))
            .map(|d| {
                let user = users.get(&d.user_id);
                DepositView::new(d, user)
            })
            .filter(|view| view.matches(&query))
            .collect();

        Ok(paginate(deposits, filter.page))
    }

    async fn get_deposit(&self, id: &str) -> Result<DepositView, ServiceError> {
        let deposit = self
            .store
            .get_deposit(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("deposit not found: {}", id)))?;
        let user = self.store.get_user(&deposit.user_id).await?;

        Ok(DepositView::new(deposit, user.as_ref()))
    }

    async fn create_deposit(&self, new_deposit: NewDeposit) -> Result<DepositView, ServiceError> {
        new_deposit.validate()?;

        let reference = match new_deposit.reference.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => reference.to_string(),
            _ => generate_reference(),
        };

        let deposit = self.store.insert_deposit(&new_deposit, &reference).await?;
        log::info!(
            "Deposit {} of {} requested for user {}",
            deposit.id,
            deposit.amount,
            deposit.user_id
        );
        self.feed
            .publish(Collection::Deposits, &deposit.id, ChangeAction::Created);

        let user = self.store.get_user(&deposit.user_id).await?;
        Ok(DepositView::new(deposit, user.as_ref()))
    }

    async fn settle(
        &self,
        id: &str,
        decision: DepositDecision,
        admin: &AdminIdentity,
    ) -> Result<Settlement, ServiceError> {
        let settlement = self
            .store
            .settle_deposit(id, decision, &admin.email)
            .await?;
        log::info!(
            "Deposit {} {} by {}",
            settlement.deposit.id,
            settlement.deposit.status,
            admin.email
        );

        self.feed
            .publish(Collection::Deposits, &settlement.deposit.id, ChangeAction::Updated);
        if let Some(user) = &settlement.user {
            self.feed
                .publish(Collection::Users, &user.id, ChangeAction::Updated);
        }
        if let Some(transaction) = &settlement.transaction {
            self.feed
                .publish(Collection::Transactions, &transaction.id, ChangeAction::Created);
        }

        Ok(settlement)
    }
}

#[async_trait]
impl RequestHandler<DepositRequest> for DepositRequestHandler {
    async fn handle_request(&self, request: DepositRequest) {
        match request {
            DepositRequest::ListDeposits { filter, response } => {
                let deposits = self.list_deposits(filter).await;
                respond("list deposits", response, deposits);
            }
            DepositRequest::GetDeposit { id, response } => {
                let deposit = self.get_deposit(&id).await;
                respond("get deposit", response, deposit);
            }
            DepositRequest::CreateDeposit { deposit, response } => {
                let deposit = self.create_deposit(deposit).await;
                respond("create deposit", response, deposit);
            }
            DepositRequest::ApproveDeposit {
                id,
                admin,
                response,
            } => {
                let settlement = self.settle(&id, DepositDecision::Approve, &admin).await;
                respond("approve deposit", response, settlement);
            }
            DepositRequest::RejectDeposit {
                id,
                admin,
                response,
            } => {
                let settlement = self.settle(&id, DepositDecision::Reject, &admin).await;
                respond("reject deposit", response, settlement);
            }
        }
    }
}

pub struct DepositService;

impl DepositService {
    pub fn new() -> Self {
        DepositService {}
    }
}

#[async_trait]
impl Service<DepositRequest, DepositRequestHandler> for DepositService {}
