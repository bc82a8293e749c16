use uuid::Uuid;

use crate::models::UnknownVariant;

pub mod admins;
pub mod deposits;
pub mod memory;
pub mod postgres;
pub mod qr_codes;
pub mod seed;
pub mod stations;
pub mod transactions;
pub mod users;

pub use admins::AdminRepository;
pub use deposits::DepositRepository;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use qr_codes::QrCodeRepository;
pub use stations::StationRepository;
pub use transactions::TransactionRepository;
pub use users::UserRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<UnknownVariant> for RepositoryError {
    fn from(e: UnknownVariant) -> Self {
        RepositoryError::Corrupt(e.to_string())
    }
}

/// Everything the services need from persistence.
pub trait Datastore:
    UserRepository
    + DepositRepository
    + TransactionRepository
    + StationRepository
    + QrCodeRepository
    + AdminRepository
    + Send
    + Sync
{
}

impl<T> Datastore for T where
    T: UserRepository
        + DepositRepository
        + TransactionRepository
        + StationRepository
        + QrCodeRepository
        + AdminRepository
        + Send
        + Sync
{
}

pub fn new_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
