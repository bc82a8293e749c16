use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stations::{FuelType, Station};
use super::{require, ValidationError};

pub const PAYLOAD_TYPE: &str = "fuel_purchase";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QrStatus {
    Active,
    Inactive,
}

string_enum!(QrStatus, "qr code status", {
    Active => "active",
    Inactive => "inactive",
});

impl QrStatus {
    pub fn toggled(self) -> Self {
        match self {
            QrStatus::Active => QrStatus::Inactive,
            QrStatus::Inactive => QrStatus::Active,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    pub id: String,
    pub station_id: String,
    pub pump_id: String,
    pub fuel_type: FuelType,
    pub price_per_liter: i64,
    pub status: QrStatus,
    pub scans: i64,
    pub created_at: DateTime<Utc>,
}

/// What the generate form submits. Without a price the station's current
/// price for the fuel type is used.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeInput {
    pub station_id: String,
    pub pump_id: String,
    #[serde(default)]
    pub fuel_type: FuelType,
    pub price_per_liter: Option<i64>,
}

impl QrCodeInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("stationId", &self.station_id)?;
        require("pumpId", &self.pump_id)?;

        if let Some(price) = self.price_per_liter {
            if price <= 0 {
                return Err(ValidationError::new("pricePerLiter must be greater than zero"));
            }
        }

        Ok(())
    }

    pub fn resolve(&self, station: &Station) -> Result<NewQrCode, ValidationError> {
        let price_per_liter = self
            .price_per_liter
            .unwrap_or_else(|| station.price_for(self.fuel_type));
        if price_per_liter <= 0 {
            return Err(ValidationError::new(format!(
                "station {} has no {} price",
                station.name, self.fuel_type
            )));
        }

        Ok(NewQrCode {
            station_id: station.id.clone(),
            pump_id: self.pump_id.trim().to_string(),
            fuel_type: self.fuel_type,
            price_per_liter,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewQrCode {
    pub station_id: String,
    pub pump_id: String,
    pub fuel_type: FuelType,
    pub price_per_liter: i64,
}

/// The flat record a pump QR symbol encodes. Scanners trust it verbatim.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub station_id: String,
    pub station_name: String,
    pub pump_id: String,
    pub fuel_type: FuelType,
    pub price_per_liter: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl QrPayload {
    pub fn new(station: &Station, pump_id: &str, fuel_type: FuelType, price_per_liter: i64) -> Self {
        QrPayload {
            station_id: station.id.clone(),
            station_name: station.name.clone(),
            pump_id: pump_id.to_string(),
            fuel_type,
            price_per_liter,
            kind: PAYLOAD_TYPE.to_string(),
        }
    }

    pub fn for_code(code: &QrCode, station: &Station) -> Self {
        QrPayload::new(station, &code.pump_id, code.fuel_type, code.price_per_liter)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeView {
    #[serde(flatten)]
    pub qr_code: QrCode,
    pub station_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stations::StationStatus;

    fn station() -> Station {
        Station {
            id: "station1".to_string(),
            name: "Main Fuel Station".to_string(),
            location: "123 Main Street".to_string(),
            city: "Lagos".to_string(),
            petrol_price: 180,
            diesel_price: 160,
            premium_price: 0,
            status: StationStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payload_is_flat_camel_case_json() {
        let payload = QrPayload::new(&station(), "PUMP-01", FuelType::Petrol, 180);
        let json: serde_json::Value = serde_json::from_str(&payload.encode().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "stationId": "station1",
                "stationName": "Main Fuel Station",
                "pumpId": "PUMP-01",
                "fuelType": "petrol",
                "pricePerLiter": 180,
                "type": "fuel_purchase"
            })
        );
    }

    #[test]
    fn resolve_falls_back_to_station_price() {
        let input = QrCodeInput {
            station_id: "station1".to_string(),
            pump_id: " PUMP-02 ".to_string(),
            fuel_type: FuelType::Diesel,
            price_per_liter: None,
        };

        let code = input.resolve(&station()).unwrap();
        assert_eq!(code.price_per_liter, 160);
        assert_eq!(code.pump_id, "PUMP-02");
    }

    #[test]
    fn resolve_rejects_unpriced_fuel() {
        let input = QrCodeInput {
            station_id: "station1".to_string(),
            pump_id: "PUMP-03".to_string(),
            fuel_type: FuelType::Premium,
            price_per_liter: None,
        };

        assert!(input.resolve(&station()).is_err());
    }

    #[test]
    fn explicit_price_must_be_positive() {
        let input = QrCodeInput {
            station_id: "station1".to_string(),
            pump_id: "PUMP-01".to_string(),
            fuel_type: FuelType::Petrol,
            price_per_liter: Some(0),
        };

        assert!(input.validate().is_err());
    }

    #[test]
    fn toggle_round_trips() {
        assert_eq!(QrStatus::Active.toggled().toggled(), QrStatus::Active);
        assert_eq!(QrStatus::Inactive.toggled(), QrStatus::Active);
    }
}
