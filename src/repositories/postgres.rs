use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::RepositoryError;

const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

#[derive(Clone)]
pub struct PgStore {
    pub(super) conn: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, anyhow::Error> {
        let conn = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(PgStore { conn })
    }

    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        sqlx::migrate!("./migrations").run(&self.conn).await?;

        Ok(())
    }
}

/// Turns a unique-constraint violation into a conflict carrying `message`.
pub(super) fn unique_violation(e: sqlx::Error, message: impl Into<String>) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(message.into())
        }
        _ => RepositoryError::Database(e),
    }
}

/// Turns an arithmetic overflow (SQLSTATE 22003) into a conflict carrying
/// `message`.
pub(super) fn numeric_overflow(e: sqlx::Error, message: impl Into<String>) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
            RepositoryError::Conflict(message.into())
        }
        _ => RepositoryError::Database(e),
    }
}
