use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::{sorted_desc, MemoryStore};
use super::postgres::PgStore;
use super::users::{UserRepository, UserRow};
use super::{new_id, RepositoryError};
use crate::models::transactions::{
    NewPurchase, Purchase, Transaction, TransactionKind, TransactionStatus,
};
use crate::models::users::{User, UserStatus};

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError>;

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, RepositoryError>;

    /// Debits an active user's balance, records a completed fuel purchase and
    /// counts a scan on the QR code used, all or nothing. The balance never
    /// goes below zero.
    async fn record_purchase(&self, purchase: &NewPurchase) -> Result<Purchase, RepositoryError>;
}

#[derive(sqlx::FromRow)]
pub(super) struct TransactionRow {
    id: String,
    user_id: String,
    station_id: Option<String>,
    kind: String,
    fuel_type: Option<String>,
    liters: Option<f64>,
    price_per_liter: Option<i64>,
    amount: i64,
    reference: String,
    status: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            station_id: row.station_id,
            kind: row.kind.parse()?,
            fuel_type: row.fuel_type.map(|f| f.parse()).transpose()?,
            liters: row.liters,
            price_per_liter: row.price_per_liter,
            amount: row.amount,
            reference: row.reference,
            status: row.status.parse()?,
            timestamp: row.timestamp,
        })
    }
}

fn zero_charge(purchase: &NewPurchase) -> RepositoryError {
    RepositoryError::Conflict(format!("purchase {} charges nothing", purchase.reference))
}

/// Explains why a debit was refused for `user`.
fn refused_debit(user: Option<User>, user_id: &str, required: i64) -> RepositoryError {
    match user {
        None => RepositoryError::not_found("user", user_id),
        Some(user) if user.status != UserStatus::Active => {
            RepositoryError::Conflict(format!("user {} is {}", user.id, user.status))
        }
        Some(user) => RepositoryError::InsufficientFunds {
            balance: user.balance,
            required,
        },
    }
}

#[async_trait]
impl TransactionRepository for PgStore {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions ORDER BY timestamp DESC")
            .fetch_all(&self.conn)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, RepositoryError> {
        sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn record_purchase(&self, purchase: &NewPurchase) -> Result<Purchase, RepositoryError> {
        if purchase.amount <= 0 {
            return Err(zero_charge(purchase));
        }

        let mut tx = self.conn.begin().await?;

        let user_row = sqlx::query_as::<_, UserRow>(
            r#"
                UPDATE users
                SET balance = balance - $1, updated_at = NOW()
                WHERE id = $2 AND status = 'active' AND balance >= $1
                RETURNING *
            "#,
        )
        .bind(purchase.amount)
        .bind(&purchase.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let user = match user_row {
            Some(row) => User::try_from(row)?,
            None => {
                tx.rollback().await?;
                let user = self.get_user(&purchase.user_id).await?;
                return Err(refused_debit(user, &purchase.user_id, purchase.amount));
            }
        };

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
                INSERT INTO transactions
                (id, user_id, station_id, kind, fuel_type, liters, price_per_liter, amount, reference, status)
                VALUES ($1, $2, $3, 'fuel_purchase', $4, $5, $6, $7, $8, 'completed')
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&purchase.user_id)
        .bind(&purchase.station_id)
        .bind(purchase.fuel_type.as_str())
        .bind(purchase.liters)
        .bind(purchase.price_per_liter)
        .bind(purchase.amount)
        .bind(&purchase.reference)
        .fetch_one(&mut *tx)
        .await?;
        let transaction = Transaction::try_from(row)?;

        if let Some(qr_code_id) = &purchase.qr_code_id {
            let updated = sqlx::query("UPDATE qr_codes SET scans = scans + 1 WHERE id = $1")
                .bind(qr_code_id)
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(RepositoryError::not_found("qr code", qr_code_id));
            }
        }

        tx.commit().await?;

        Ok(Purchase { transaction, user })
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        Ok(sorted_desc(&self.transactions, |t| t.timestamp))
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.transactions.get(id).map(|t| t.clone()))
    }

    async fn record_purchase(&self, purchase: &NewPurchase) -> Result<Purchase, RepositoryError> {
        if purchase.amount <= 0 {
            return Err(zero_charge(purchase));
        }

        let _ledger = self.lock_ledger();

        if let Some(qr_code_id) = &purchase.qr_code_id {
            if !self.qr_codes.contains_key(qr_code_id) {
                return Err(RepositoryError::not_found("qr code", qr_code_id));
            }
        }

        let user = {
            let mut user = match self.users.get_mut(&purchase.user_id) {
                Some(user) if user.is_active() && user.balance >= purchase.amount => user,
                other => {
                    let user = other.map(|u| u.clone());
                    return Err(refused_debit(user, &purchase.user_id, purchase.amount));
                }
            };
            user.balance -= purchase.amount;
            user.updated_at = Utc::now();
            user.clone()
        };

        let transaction = Transaction {
            id: new_id(),
            user_id: purchase.user_id.clone(),
            station_id: Some(purchase.station_id.clone()),
            kind: TransactionKind::FuelPurchase,
            fuel_type: Some(purchase.fuel_type),
            liters: Some(purchase.liters),
            price_per_liter: Some(purchase.price_per_liter),
            amount: purchase.amount,
            reference: purchase.reference.clone(),
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        };
        self.transactions
            .insert(transaction.id.clone(), transaction.clone());

        if let Some(qr_code_id) = &purchase.qr_code_id {
            if let Some(mut code) = self.qr_codes.get_mut(qr_code_id) {
                code.scans += 1;
            }
        }

        Ok(Purchase { transaction, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stations::FuelType;
    use crate::models::transactions::fuel_amount;
    use crate::models::users::NewUser;

    fn purchase(user_id: &str, liters: f64) -> NewPurchase {
        NewPurchase {
            user_id: user_id.to_string(),
            station_id: "station1".to_string(),
            fuel_type: FuelType::Petrol,
            liters,
            price_per_liter: 180,
            amount: fuel_amount(liters, 180),
            reference: "TRX-001".to_string(),
            qr_code_id: None,
        }
    }

    async fn funded_user(store: &MemoryStore, balance: i64) -> User {
        let user = store
            .insert_user(&NewUser {
                name: "Jane Smith".to_string(),
                email: "jane@example.com".to_string(),
                phone: "+2348023456789".to_string(),
            })
            .await
            .unwrap();
        store.users.get_mut(&user.id).unwrap().balance = balance;
        store.get_user(&user.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn purchase_debits_balance() {
        let store = MemoryStore::new();
        let user = funded_user(&store, 25_000).await;

        let result = store.record_purchase(&purchase(&user.id, 25.0)).await.unwrap();

        assert_eq!(result.user.balance, 20_500);
        assert_eq!(result.transaction.amount, 4_500);
        assert!(result.transaction.amount_is_consistent());
    }

    #[tokio::test]
    async fn purchase_never_overdraws() {
        let store = MemoryStore::new();
        let user = funded_user(&store, 1_000).await;

        let result = store.record_purchase(&purchase(&user.id, 10.0)).await;

        assert!(matches!(
            result,
            Err(RepositoryError::InsufficientFunds {
                balance: 1_000,
                required: 1_800
            })
        ));
        assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().balance, 1_000);
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suspended_user_cannot_purchase() {
        let store = MemoryStore::new();
        let user = funded_user(&store, 50_000).await;
        store
            .set_user_status(&user.id, UserStatus::Suspended)
            .await
            .unwrap();

        let result = store.record_purchase(&purchase(&user.id, 1.0)).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn zero_charge_is_refused() {
        let store = MemoryStore::new();
        let user = funded_user(&store, 0).await;

        let result = store.record_purchase(&purchase(&user.id, 0.001)).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    mod postgres {
        use sqlx::PgPool;

        use super::*;

        async fn funded_user(store: &PgStore, balance: i64) -> User {
            let user = store
                .insert_user(&NewUser {
                    name: "Jane Smith".to_string(),
                    email: "jane@example.com".to_string(),
                    phone: "+2348023456789".to_string(),
                })
                .await
                .unwrap();
            sqlx::query("UPDATE users SET balance = $1 WHERE id = $2")
                .bind(balance)
                .bind(&user.id)
                .execute(&store.conn)
                .await
                .unwrap();

            store.get_user(&user.id).await.unwrap().unwrap()
        }

        #[sqlx::test]
        #[ignore = "needs DATABASE_URL"]
        async fn overdraw_is_refused(conn: PgPool) {
            let store = PgStore { conn };
            let user = funded_user(&store, 1_000).await;

            let result = store.record_purchase(&purchase(&user.id, 10.0)).await;

            assert!(matches!(
                result,
                Err(RepositoryError::InsufficientFunds {
                    balance: 1_000,
                    required: 1_800
                })
            ));
            assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().balance, 1_000);
            assert!(store.list_transactions().await.unwrap().is_empty());
        }

        #[sqlx::test]
        #[ignore = "needs DATABASE_URL"]
        async fn concurrent_purchases_stop_at_zero(conn: PgPool) {
            let store = PgStore { conn };
            let user = funded_user(&store, 4_500).await;

            let attempts: Vec<_> = (0..4)
                .map(|i| {
                    let store = store.clone();
                    let mut purchase = purchase(&user.id, 10.0);
                    purchase.reference = format!("TRX-00{}", i);
                    tokio::spawn(async move { store.record_purchase(&purchase).await })
                })
                .collect();

            let mut applied = 0;
            for attempt in attempts {
                if attempt.await.unwrap().is_ok() {
                    applied += 1;
                }
            }

            assert_eq!(applied, 2);
            assert_eq!(store.get_user(&user.id).await.unwrap().unwrap().balance, 900);
            assert_eq!(store.list_transactions().await.unwrap().len(), 2);
        }
    }
}
