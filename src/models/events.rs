use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Deposits,
    Transactions,
    Stations,
    QrCodes,
}

string_enum!(Collection, "collection", {
    Users => "users",
    Deposits => "deposits",
    Transactions => "transactions",
    Stations => "stations",
    QrCodes => "qr_codes",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// One record-level change. Subscribers apply these instead of refetching a
/// whole collection.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
    pub action: ChangeAction,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, id: impl Into<String>, action: ChangeAction) -> Self {
        ChangeEvent {
            collection,
            id: id.into(),
            action,
            at: Utc::now(),
        }
    }
}
