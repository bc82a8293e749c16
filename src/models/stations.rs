use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, ValidationError};
use crate::utils::contains_ignore_case;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    #[default]
    Petrol,
    Diesel,
    Premium,
}

string_enum!(FuelType, "fuel type", {
    Petrol => "petrol",
    Diesel => "diesel",
    Premium => "premium",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
}

string_enum!(StationStatus, "station status", {
    Active => "active",
    Inactive => "inactive",
    Maintenance => "maintenance",
});

impl StationStatus {
    /// Flips between active and inactive. A station under maintenance has to
    /// be moved out of it explicitly.
    pub fn toggled(self) -> Option<Self> {
        match self {
            StationStatus::Active => Some(StationStatus::Inactive),
            StationStatus::Inactive => Some(StationStatus::Active),
            StationStatus::Maintenance => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: String,
    pub city: String,
    pub petrol_price: i64,
    pub diesel_price: i64,
    pub premium_price: i64,
    pub status: StationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Station {
    pub fn price_for(&self, fuel_type: FuelType) -> i64 {
        match fuel_type {
            FuelType::Petrol => self.petrol_price,
            FuelType::Diesel => self.diesel_price,
            FuelType::Premium => self.premium_price,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        contains_ignore_case(&self.name, query)
            || contains_ignore_case(&self.location, query)
            || contains_ignore_case(&self.city, query)
    }

    pub fn is_active(&self) -> bool {
        self.status == StationStatus::Active
    }
}

/// Body of both the create and the edit form; an edit replaces every field.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationInput {
    pub name: String,
    pub location: String,
    pub city: String,
    #[serde(default)]
    pub petrol_price: i64,
    #[serde(default)]
    pub diesel_price: i64,
    #[serde(default)]
    pub premium_price: i64,
}

impl StationInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("location", &self.location)?;
        require("city", &self.city)?;

        let prices = [
            ("petrolPrice", self.petrol_price),
            ("dieselPrice", self.diesel_price),
            ("premiumPrice", self.premium_price),
        ];
        if let Some((field, _)) = prices.iter().find(|(_, price)| *price < 0) {
            return Err(ValidationError::new(format!("{} must not be negative", field)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> StationInput {
        StationInput {
            name: "Main Fuel Station".to_string(),
            location: "123 Main Street".to_string(),
            city: "Lagos".to_string(),
            petrol_price: 180,
            diesel_price: 160,
            premium_price: 200,
        }
    }

    #[test]
    fn toggle_is_reversible_outside_maintenance() {
        for status in [StationStatus::Active, StationStatus::Inactive] {
            let toggled = status.toggled().unwrap();
            assert_eq!(toggled.toggled(), Some(status));
        }
        assert_eq!(StationStatus::Maintenance.toggled(), None);
    }

    #[test]
    fn rejects_negative_prices() {
        let mut station = input();
        assert!(station.validate().is_ok());

        station.diesel_price = -1;
        assert_eq!(
            station.validate().unwrap_err().to_string(),
            "dieselPrice must not be negative"
        );
    }

    #[test]
    fn rejects_blank_city() {
        let mut station = input();
        station.city = String::new();
        assert!(station.validate().is_err());
    }

    #[test]
    fn fuel_type_defaults_to_petrol() {
        assert_eq!(FuelType::default(), FuelType::Petrol);
        assert_eq!("premium".parse::<FuelType>().unwrap(), FuelType::Premium);
    }
}
