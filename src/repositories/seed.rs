use log::info;

use super::{Datastore, RepositoryError};
use crate::models::deposits::{DepositDecision, DepositMethod, NewDeposit};
use crate::models::qr_codes::NewQrCode;
use crate::models::stations::{FuelType, StationInput};
use crate::models::transactions::{fuel_amount, NewPurchase};
use crate::models::users::{NewUser, User, UserStatus};

const SEED_ADMIN: &str = "seed";

fn user(name: &str, email: &str, phone: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
    }
}

fn station(name: &str, location: &str, city: &str, prices: [i64; 3]) -> StationInput {
    StationInput {
        name: name.to_string(),
        location: location.to_string(),
        city: city.to_string(),
        petrol_price: prices[0],
        diesel_price: prices[1],
        premium_price: prices[2],
    }
}

async fn fund(
    store: &dyn Datastore,
    user: &User,
    amount: i64,
    method: DepositMethod,
    reference: &str,
) -> Result<(), RepositoryError> {
    let deposit = store
        .insert_deposit(
            &NewDeposit {
                user_id: user.id.clone(),
                amount,
                method,
                reference: None,
            },
            reference,
        )
        .await?;
    store
        .settle_deposit(&deposit.id, DepositDecision::Approve, SEED_ADMIN)
        .await?;

    Ok(())
}

/// Loads the demo data set into an empty store. Balances are reached through
/// approved deposits and a purchase so the ledger stays consistent. Returns
/// `false` when the store already holds users.
pub async fn seed_demo_data(store: &dyn Datastore) -> Result<bool, RepositoryError> {
    if !store.list_users().await?.is_empty() {
        info!("Store already has users, skipping demo data");
        return Ok(false);
    }

    let lagos = store
        .insert_station(&station(
            "Main Fuel Station",
            "123 Main Street",
            "Lagos",
            [180, 160, 200],
        ))
        .await?;
    let abuja = store
        .insert_station(&station(
            "Express Fuel Depot",
            "456 Broad Street",
            "Abuja",
            [185, 165, 205],
        ))
        .await?;

    let lagos_pump = store
        .insert_qr_code(&NewQrCode {
            station_id: lagos.id.clone(),
            pump_id: "PUMP-01".to_string(),
            fuel_type: FuelType::Petrol,
            price_per_liter: lagos.petrol_price,
        })
        .await?;
    store
        .insert_qr_code(&NewQrCode {
            station_id: abuja.id.clone(),
            pump_id: "PUMP-01".to_string(),
            fuel_type: FuelType::Diesel,
            price_per_liter: 160,
        })
        .await?;

    let john = store
        .insert_user(&user("John Doe", "john@example.com", "+2348012345678"))
        .await?;
    let jane = store
        .insert_user(&user("Jane Smith", "jane@example.com", "+2348023456789"))
        .await?;
    let mike = store
        .insert_user(&user("Mike Johnson", "mike@example.com", "+2348034567890"))
        .await?;

    fund(store, &john, 19_500, DepositMethod::BankTransfer, "DEP-001").await?;
    store
        .record_purchase(&NewPurchase {
            user_id: john.id.clone(),
            station_id: lagos.id.clone(),
            fuel_type: FuelType::Petrol,
            liters: 25.0,
            price_per_liter: lagos_pump.price_per_liter,
            amount: fuel_amount(25.0, lagos_pump.price_per_liter),
            reference: "TRX-001".to_string(),
            qr_code_id: Some(lagos_pump.id.clone()),
        })
        .await?;
    store
        .insert_deposit(
            &NewDeposit {
                user_id: john.id.clone(),
                amount: 10_000,
                method: DepositMethod::BankTransfer,
                reference: None,
            },
            "TRX-123456",
        )
        .await?;

    fund(store, &jane, 25_000, DepositMethod::Cash, "TRX-123457").await?;

    fund(store, &mike, 8_000, DepositMethod::Cash, "DEP-002").await?;
    store
        .set_user_status(&mike.id, UserStatus::Suspended)
        .await?;

    info!("Seeded demo data: 3 users, 2 stations, 2 QR codes");

    Ok(true)
}
