use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::{sorted_desc, MemoryStore};
use super::postgres::PgStore;
use super::{new_id, RepositoryError};
use crate::models::stations::{Station, StationInput, StationStatus};

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn list_stations(&self) -> Result<Vec<Station>, RepositoryError>;

    async fn get_station(&self, id: &str) -> Result<Option<Station>, RepositoryError>;

    async fn insert_station(&self, input: &StationInput) -> Result<Station, RepositoryError>;

    async fn update_station(
        &self,
        id: &str,
        input: &StationInput,
    ) -> Result<Option<Station>, RepositoryError>;

    async fn set_station_status(
        &self,
        id: &str,
        status: StationStatus,
    ) -> Result<Option<Station>, RepositoryError>;

    /// Flips active and inactive. Fails with `Conflict` for a station under
    /// maintenance.
    async fn toggle_station_status(&self, id: &str) -> Result<Option<Station>, RepositoryError>;

    /// Removes the station together with its QR codes. Transactions keep
    /// their station reference.
    async fn delete_station(&self, id: &str) -> Result<bool, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct StationRow {
    id: String,
    name: String,
    location: String,
    city: String,
    petrol_price: i64,
    diesel_price: i64,
    premium_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StationRow> for Station {
    type Error = RepositoryError;

    fn try_from(row: StationRow) -> Result<Self, Self::Error> {
        Ok(Station {
            id: row.id,
            name: row.name,
            location: row.location,
            city: row.city,
            petrol_price: row.petrol_price,
            diesel_price: row.diesel_price,
            premium_price: row.premium_price,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn under_maintenance(id: &str) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "station {} is under maintenance, set its status explicitly",
        id
    ))
}

#[async_trait]
impl StationRepository for PgStore {
    async fn list_stations(&self) -> Result<Vec<Station>, RepositoryError> {
        sqlx::query_as::<_, StationRow>("SELECT * FROM stations ORDER BY created_at DESC")
            .fetch_all(&self.conn)
            .await?
            .into_iter()
            .map(Station::try_from)
            .collect()
    }

    async fn get_station(&self, id: &str) -> Result<Option<Station>, RepositoryError> {
        sqlx::query_as::<_, StationRow>("SELECT * FROM stations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?
            .map(Station::try_from)
            .transpose()
    }

    async fn insert_station(&self, input: &StationInput) -> Result<Station, RepositoryError> {
        let row = sqlx::query_as::<_, StationRow>(
            r#"
                INSERT INTO stations
                (id, name, location, city, petrol_price, diesel_price, premium_price, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(input.name.trim())
        .bind(input.location.trim())
        .bind(input.city.trim())
        .bind(input.petrol_price)
        .bind(input.diesel_price)
        .bind(input.premium_price)
        .fetch_one(&self.conn)
        .await?;

        row.try_into()
    }

    async fn update_station(
        &self,
        id: &str,
        input: &StationInput,
    ) -> Result<Option<Station>, RepositoryError> {
        sqlx::query_as::<_, StationRow>(
            r#"
                UPDATE stations
                SET name = $1, location = $2, city = $3,
                    petrol_price = $4, diesel_price = $5, premium_price = $6,
                    updated_at = NOW()
                WHERE id = $7
                RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.location.trim())
        .bind(input.city.trim())
        .bind(input.petrol_price)
        .bind(input.diesel_price)
        .bind(input.premium_price)
        .bind(id)
        .fetch_optional(&self.conn)
        .await?
        .map(Station::try_from)
        .transpose()
    }

    async fn set_station_status(
        &self,
        id: &str,
        status: StationStatus,
    ) -> Result<Option<Station>, RepositoryError> {
        sqlx::query_as::<_, StationRow>(
            "UPDATE stations SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.conn)
        .await?
        .map(Station::try_from)
        .transpose()
    }

    async fn toggle_station_status(&self, id: &str) -> Result<Option<Station>, RepositoryError> {
        let toggled = sqlx::query_as::<_, StationRow>(
            r#"
                UPDATE stations
                SET status = CASE status WHEN 'active' THEN 'inactive' ELSE 'active' END,
                    updated_at = NOW()
                WHERE id = $1 AND status IN ('active', 'inactive')
                RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        match toggled {
            Some(row) => Ok(Some(row.try_into()?)),
            None => match self.get_station(id).await? {
                Some(_) => Err(under_maintenance(id)),
                None => Ok(None),
            },
        }
    }

    async fn delete_station(&self, id: &str) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM stations WHERE id = $1")
            .bind(id)
            .execute(&self.conn)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl StationRepository for MemoryStore {
    async fn list_stations(&self) -> Result<Vec<Station>, RepositoryError> {
        Ok(sorted_desc(&self.stations, |s| s.created_at))
    }

    async fn get_station(&self, id: &str) -> Result<Option<Station>, RepositoryError> {
        Ok(self.stations.get(id).map(|s| s.clone()))
    }

    async fn insert_station(&self, input: &StationInput) -> Result<Station, RepositoryError> {
        let now = Utc::now();
        let station = Station {
            id: new_id(),
            name: input.name.trim().to_string(),
            location: input.location.trim().to_string(),
            city: input.city.trim().to_string(),
            petrol_price: input.petrol_price,
            diesel_price: input.diesel_price,
            premium_price: input.premium_price,
            status: StationStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.stations.insert(station.id.clone(), station.clone());

        Ok(station)
    }

    async fn update_station(
        &self,
        id: &str,
        input: &StationInput,
    ) -> Result<Option<Station>, RepositoryError> {
        Ok(self.stations.get_mut(id).map(|mut station| {
            station.name = input.name.trim().to_string();
            station.location = input.location.trim().to_string();
            station.city = input.city.trim().to_string();
            station.petrol_price = input.petrol_price;
            station.diesel_price = input.diesel_price;
            station.premium_price = input.premium_price;
            station.updated_at = Utc::now();
            station.clone()
        }))
    }

    async fn set_station_status(
        &self,
        id: &str,
        status: StationStatus,
    ) -> Result<Option<Station>, RepositoryError> {
        Ok(self.stations.get_mut(id).map(|mut station| {
            station.status = status;
            station.updated_at = Utc::now();
            station.clone()
        }))
    }

    async fn toggle_station_status(&self, id: &str) -> Result<Option<Station>, RepositoryError> {
        let Some(mut station) = self.stations.get_mut(id) else {
            return Ok(None);
        };
        let status = station.status.toggled().ok_or_else(|| under_maintenance(id))?;
        station.status = status;
        station.updated_at = Utc::now();

        Ok(Some(station.clone()))
    }

    async fn delete_station(&self, id: &str) -> Result<bool, RepositoryError> {
        let _ledger = self.lock_ledger();

        if self.stations.remove(id).is_none() {
            return Ok(false);
        }
        self.qr_codes.retain(|_, code| code.station_id != id);

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> StationInput {
        StationInput {
            name: name.to_string(),
            location: "Victoria Island".to_string(),
            city: "Lagos".to_string(),
            petrol_price: 180,
            diesel_price: 160,
            premium_price: 200,
        }
    }

    #[tokio::test]
    async fn new_station_starts_active() {
        let store = MemoryStore::new();
        let station = store.insert_station(&input("  Main Fuel Station ")).await.unwrap();

        assert_eq!(station.name, "Main Fuel Station");
        assert_eq!(station.status, StationStatus::Active);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let store = MemoryStore::new();
        let station = store.insert_station(&input("Main Fuel Station")).await.unwrap();

        let mut edit = input("Express Fuel Depot");
        edit.petrol_price = 185;
        let updated = store.update_station(&station.id, &edit).await.unwrap().unwrap();

        assert_eq!(updated.name, "Express Fuel Depot");
        assert_eq!(updated.petrol_price, 185);
        assert!(store.update_station("missing", &edit).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn maintenance_blocks_toggle() {
        let store = MemoryStore::new();
        let station = store.insert_station(&input("Main Fuel Station")).await.unwrap();

        let toggled = store.toggle_station_status(&station.id).await.unwrap().unwrap();
        assert_eq!(toggled.status, StationStatus::Inactive);

        store
            .set_station_status(&station.id, StationStatus::Maintenance)
            .await
            .unwrap();
        let result = store.toggle_station_status(&station.id).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_reports_missing_station() {
        let store = MemoryStore::new();
        let station = store.insert_station(&input("Main Fuel Station")).await.unwrap();

        assert!(store.delete_station(&station.id).await.unwrap());
        assert!(!store.delete_station(&station.id).await.unwrap());
    }
}
