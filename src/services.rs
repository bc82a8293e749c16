use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::models::ValidationError;
use crate::repositories::{self, Datastore, RepositoryError};
use crate::settings::Settings;

pub mod auth;
pub mod dashboard;
pub mod deposits;
pub mod feed;
pub mod http;
pub mod qr_codes;
pub mod stations;
pub mod transactions;
pub mod users;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },
    #[error("{0}")]
    Unauthorized(String),
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound { .. } => ServiceError::NotFound(e.to_string()),
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            RepositoryError::InsufficientFunds { balance, required } => {
                ServiceError::InsufficientFunds { balance, required }
            }
            RepositoryError::Corrupt(_) | RepositoryError::Database(_) => {
                ServiceError::Repository(e.to_string())
            }
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        ServiceError::Invalid(e.0)
    }
}

pub type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh reply channel and waits for the
/// answer.
pub async fn call<T, R>(
    channel: &mpsc::Sender<T>,
    request: impl FnOnce(Reply<R>) -> T,
) -> Result<R, ServiceError> {
    let (response, receiver) = oneshot::channel();

    channel
        .send(request(response))
        .await
        .map_err(|e| ServiceError::Communication("send".to_string(), e.to_string()))?;

    receiver
        .await
        .map_err(|e| ServiceError::Communication("receive".to_string(), e.to_string()))?
}

/// Replies on `response`, logging failures on the way out.
pub(crate) fn respond<T>(context: &str, response: Reply<T>, result: Result<T, ServiceError>) {
    if let Err(e) = &result {
        match e {
            ServiceError::Repository(_)
            | ServiceError::Communication(..)
            | ServiceError::Internal(_) => log::error!("{}: {}", context, e),
            _ => log::warn!("{}: {}", context, e),
        }
    }

    if response.send(result).is_err() {
        log::debug!("{}: caller went away before the reply", context);
    }
}

/// Senders for every running service plus the change feed.
#[derive(Clone)]
pub struct ServiceChannels {
    pub users: mpsc::Sender<users::UserRequest>,
    pub deposits: mpsc::Sender<deposits::DepositRequest>,
    pub transactions: mpsc::Sender<transactions::TransactionRequest>,
    pub stations: mpsc::Sender<stations::StationRequest>,
    pub qr_codes: mpsc::Sender<qr_codes::QrCodeRequest>,
    pub dashboard: mpsc::Sender<dashboard::DashboardRequest>,
    pub auth: mpsc::Sender<auth::AuthRequest>,
    pub feed: feed::ChangeFeed,
}

pub async fn start_services(
    store: Arc<dyn Datastore>,
    settings: &Settings,
) -> Result<ServiceChannels, anyhow::Error> {
    if settings.store.seed_demo_data {
        repositories::seed::seed_demo_data(store.as_ref()).await?;
    }

    let feed = feed::ChangeFeed::new(CHANNEL_CAPACITY);

    let (user_tx, mut user_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (deposit_tx, mut deposit_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (transaction_tx, mut transaction_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (station_tx, mut station_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (qr_code_tx, mut qr_code_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (dashboard_tx, mut dashboard_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (auth_tx, mut auth_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let auth_handler = auth::AuthRequestHandler::new(store.clone(), settings.session.ttl_minutes);
    if let Some(admin) = &settings.admin {
        auth_handler
            .ensure_admin(&admin.email, &admin.password, &admin.display_name)
            .await?;
    }

    log::info!("Starting user service.");
    let handler = users::UserRequestHandler::new(store.clone(), feed.clone());
    tokio::spawn(async move {
        users::UserService::new().run(handler, &mut user_rx).await;
    });

    log::info!("Starting deposit service.");
    let handler = deposits::DepositRequestHandler::new(store.clone(), feed.clone());
    tokio::spawn(async move {
        deposits::DepositService::new()
            .run(handler, &mut deposit_rx)
            .await;
    });

    log::info!("Starting transaction service.");
    let handler = transactions::TransactionRequestHandler::new(store.clone(), feed.clone());
    tokio::spawn(async move {
        transactions::TransactionService::new()
            .run(handler, &mut transaction_rx)
            .await;
    });

    log::info!("Starting station service.");
    let handler = stations::StationRequestHandler::new(store.clone(), feed.clone());
    tokio::spawn(async move {
        stations::StationService::new()
            .run(handler, &mut station_rx)
            .await;
    });

    log::info!("Starting QR code service.");
    let handler = qr_codes::QrCodeRequestHandler::new(store.clone(), feed.clone(), settings.qr.size);
    tokio::spawn(async move {
        qr_codes::QrCodeService::new()
            .run(handler, &mut qr_code_rx)
            .await;
    });

    log::info!("Starting dashboard service.");
    let handler = dashboard::DashboardRequestHandler::new(store.clone());
    tokio::spawn(async move {
        dashboard::DashboardService::new()
            .run(handler, &mut dashboard_rx)
            .await;
    });

    log::info!("Starting auth service.");
    auth_handler.start_session_sweeper();
    tokio::spawn(async move {
        auth::AuthService::new().run(auth_handler, &mut auth_rx).await;
    });

    log::info!("Started services.");

    Ok(ServiceChannels {
        users: user_tx,
        deposits: deposit_tx,
        transactions: transaction_tx,
        stations: station_tx,
        qr_codes: qr_code_tx,
        dashboard: dashboard_tx,
        auth: auth_tx,
        feed,
    })
}
