use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::{sorted_desc, MemoryStore};
use super::postgres::{unique_violation, PgStore};
use super::{new_id, RepositoryError};
use crate::models::qr_codes::{NewQrCode, QrCode, QrStatus};

#[async_trait]
pub trait QrCodeRepository: Send + Sync {
    async fn list_qr_codes(&self) -> Result<Vec<QrCode>, RepositoryError>;

    async fn get_qr_code(&self, id: &str) -> Result<Option<QrCode>, RepositoryError>;

    /// Stores an active code with no scans. A pump carries at most one code
    /// per station.
    async fn insert_qr_code(&self, new_code: &NewQrCode) -> Result<QrCode, RepositoryError>;

    async fn toggle_qr_status(&self, id: &str) -> Result<Option<QrCode>, RepositoryError>;

    async fn delete_qr_code(&self, id: &str) -> Result<bool, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct QrCodeRow {
    id: String,
    station_id: String,
    pump_id: String,
    fuel_type: String,
    price_per_liter: i64,
    status: String,
    scans: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<QrCodeRow> for QrCode {
    type Error = RepositoryError;

    fn try_from(row: QrCodeRow) -> Result<Self, Self::Error> {
        Ok(QrCode {
            id: row.id,
            station_id: row.station_id,
            pump_id: row.pump_id,
            fuel_type: row.fuel_type.parse()?,
            price_per_liter: row.price_per_liter,
            status: row.status.parse()?,
            scans: row.scans,
            created_at: row.created_at,
        })
    }
}

fn pump_taken(new_code: &NewQrCode) -> String {
    format!(
        "pump {} already has a QR code at station {}",
        new_code.pump_id, new_code.station_id
    )
}

#[async_trait]
impl QrCodeRepository for PgStore {
    async fn list_qr_codes(&self) -> Result<Vec<QrCode>, RepositoryError> {
        sqlx::query_as::<_, QrCodeRow>("SELECT * FROM qr_codes ORDER BY created_at DESC")
            .fetch_all(&self.conn)
            .await?
            .into_iter()
            .map(QrCode::try_from)
            .collect()
    }

    async fn get_qr_code(&self, id: &str) -> Result<Option<QrCode>, RepositoryError> {
        sqlx::query_as::<_, QrCodeRow>("SELECT * FROM qr_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?
            .map(QrCode::try_from)
            .transpose()
    }

    async fn insert_qr_code(&self, new_code: &NewQrCode) -> Result<QrCode, RepositoryError> {
        let row = sqlx::query_as::<_, QrCodeRow>(
            r#"
                INSERT INTO qr_codes (id, station_id, pump_id, fuel_type, price_per_liter, status, scans)
                SELECT $1, id, $3, $4, $5, 'active', 0 FROM stations WHERE id = $2
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&new_code.station_id)
        .bind(&new_code.pump_id)
        .bind(new_code.fuel_type.as_str())
        .bind(new_code.price_per_liter)
        .fetch_optional(&self.conn)
        .await
        .map_err(|e| unique_violation(e, pump_taken(new_code)))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(RepositoryError::not_found("station", &new_code.station_id)),
        }
    }

    async fn toggle_qr_status(&self, id: &str) -> Result<Option<QrCode>, RepositoryError> {
        sqlx::query_as::<_, QrCodeRow>(
            r#"
                UPDATE qr_codes
                SET status = CASE status WHEN 'active' THEN 'inactive' ELSE 'active' END
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.conn)
        .await?
        .map(QrCode::try_from)
        .transpose()
    }

    async fn delete_qr_code(&self, id: &str) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM qr_codes WHERE id = $1")
            .bind(id)
            .execute(&self.conn)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl QrCodeRepository for MemoryStore {
    async fn list_qr_codes(&self) -> Result<Vec<QrCode>, RepositoryError> {
        Ok(sorted_desc(&self.qr_codes, |q| q.created_at))
    }

    async fn get_qr_code(&self, id: &str) -> Result<Option<QrCode>, RepositoryError> {
        Ok(self.qr_codes.get(id).map(|q| q.clone()))
    }

    async fn insert_qr_code(&self, new_code: &NewQrCode) -> Result<QrCode, RepositoryError> {
        let _ledger = self.lock_ledger();

        if !self.stations.contains_key(&new_code.station_id) {
            return Err(RepositoryError::not_found("station", &new_code.station_id));
        }
        if self
            .qr_codes
            .iter()
            .any(|q| q.station_id == new_code.station_id && q.pump_id == new_code.pump_id)
        {
            return Err(RepositoryError::Conflict(pump_taken(new_code)));
        }

        let code = QrCode {
            id: new_id(),
            station_id: new_code.station_id.clone(),
            pump_id: new_code.pump_id.clone(),
            fuel_type: new_code.fuel_type,
            price_per_liter: new_code.price_per_liter,
            status: QrStatus::Active,
            scans: 0,
            created_at: Utc::now(),
        };
        self.qr_codes.insert(code.id.clone(), code.clone());

        Ok(code)
    }

    async fn toggle_qr_status(&self, id: &str) -> Result<Option<QrCode>, RepositoryError> {
        Ok(self.qr_codes.get_mut(id).map(|mut code| {
            code.status = code.status.toggled();
            code.clone()
        }))
    }

    async fn delete_qr_code(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.qr_codes.remove(id).is_some())
    }
}
