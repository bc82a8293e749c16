use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stations::FuelType;
use super::users::User;
use super::ValidationError;
use crate::utils::{contains_ignore_case, format_naira};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    FuelPurchase,
    Deposit,
}

string_enum!(TransactionKind, "transaction kind", {
    FuelPurchase => "fuel_purchase",
    Deposit => "deposit",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

string_enum!(TransactionStatus, "transaction status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub station_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub fuel_type: Option<FuelType>,
    pub liters: Option<f64>,
    pub price_per_liter: Option<i64>,
    pub amount: i64,
    pub reference: String,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Fuel purchases must charge exactly `liters × pricePerLiter`, rounded to
    /// whole naira. Records without a fuel type carry no such constraint.
    pub fn amount_is_consistent(&self) -> bool {
        match (self.fuel_type, self.liters, self.price_per_liter) {
            (None, _, _) => true,
            (Some(_), Some(liters), Some(price)) => fuel_amount(liters, price) == self.amount,
            (Some(_), _, _) => false,
        }
    }

    pub fn is_completed_purchase(&self) -> bool {
        self.kind == TransactionKind::FuelPurchase && self.status == TransactionStatus::Completed
    }
}

pub fn fuel_amount(liters: f64, price_per_liter: i64) -> i64 {
    (liters * price_per_liter as f64).round() as i64
}

/// A fully resolved purchase ready to be applied by the datastore.
#[derive(Clone, Debug)]
pub struct NewPurchase {
    pub user_id: String,
    pub station_id: String,
    pub fuel_type: FuelType,
    pub liters: f64,
    pub price_per_liter: i64,
    pub amount: i64,
    pub reference: String,
    pub qr_code_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_id: String,
    pub qr_code_id: Option<String>,
    pub station_id: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub liters: f64,
}

impl PurchaseRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.liters.is_finite() || self.liters <= 0.0 {
            return Err(ValidationError::new("liters must be greater than zero"));
        }

        if self.qr_code_id.is_none() && (self.station_id.is_none() || self.fuel_type.is_none()) {
            return Err(ValidationError::new(
                "either qrCodeId or stationId with fuelType is required",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Purchase {
    pub transaction: Transaction,
    pub user: User,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub station_name: Option<String>,
    pub amount_display: String,
}

impl TransactionView {
    pub fn new(
        transaction: Transaction,
        user: Option<&User>,
        station_name: Option<String>,
    ) -> Self {
        let amount_display = format_naira(transaction.amount);

        TransactionView {
            transaction,
            user_name: user.map(|u| u.name.clone()),
            user_email: user.map(|u| u.email.clone()),
            station_name,
            amount_display,
        }
    }

    /// User name and email match case-insensitively; the reference is matched
    /// verbatim.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        self.user_name
            .as_deref()
            .is_some_and(|name| contains_ignore_case(name, query))
            || self
                .user_email
                .as_deref()
                .is_some_and(|email| contains_ignore_case(email, query))
            || self.transaction.reference.contains(query)
    }
}
