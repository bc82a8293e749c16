use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::{sorted_desc, MemoryStore};
use super::postgres::{numeric_overflow, PgStore};
use super::transactions::TransactionRow;
use super::users::UserRow;
use super::{new_id, RepositoryError};
use crate::models::deposits::{Deposit, DepositDecision, DepositStatus, NewDeposit, Settlement};
use crate::models::transactions::{Transaction, TransactionKind, TransactionStatus};
use crate::models::users::User;

#[async_trait]
pub trait DepositRepository: Send + Sync {
    async fn list_deposits(&self) -> Result<Vec<Deposit>, RepositoryError>;

    async fn get_deposit(&self, id: &str) -> Result<Option<Deposit>, RepositoryError>;

    async fn insert_deposit(
        &self,
        new_deposit: &NewDeposit,
        reference: &str,
    ) -> Result<Deposit, RepositoryError>;

    /// Moves a pending deposit to its terminal state in one atomic step. On
    /// approval the user's balance is credited and a completed `deposit`
    /// transaction is written alongside. A deposit that is no longer pending
    /// yields `Conflict` and nothing is changed.
    async fn settle_deposit(
        &self,
        id: &str,
        decision: DepositDecision,
        processed_by: &str,
    ) -> Result<Settlement, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct DepositRow {
    id: String,
    user_id: String,
    amount: i64,
    method: String,
    reference: String,
    status: String,
    timestamp: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<String>,
}

impl TryFrom<DepositRow> for Deposit {
    type Error = RepositoryError;

    fn try_from(row: DepositRow) -> Result<Self, Self::Error> {
        Ok(Deposit {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            method: row.method.parse()?,
            reference: row.reference,
            status: row.status.parse()?,
            timestamp: row.timestamp,
            processed_at: row.processed_at,
            processed_by: row.processed_by,
        })
    }
}

fn already_settled(deposit: &Deposit) -> RepositoryError {
    RepositoryError::Conflict(format!("deposit {} is already {}", deposit.id, deposit.status))
}

fn balance_overflow(deposit: &Deposit) -> String {
    format!(
        "crediting deposit {} would overflow the balance of user {}",
        deposit.id, deposit.user_id
    )
}

#[async_trait]
impl DepositRepository for PgStore {
    async fn list_deposits(&self) -> Result<Vec<Deposit>, RepositoryError> {
        sqlx::query_as::<_, DepositRow>("SELECT * FROM deposits ORDER BY timestamp DESC")
            .fetch_all(&self.conn)
            .await?
            .into_iter()
            .map(Deposit::try_from)
            .collect()
    }

    async fn get_deposit(&self, id: &str) -> Result<Option<Deposit>, RepositoryError> {
        sqlx::query_as::<_, DepositRow>("SELECT * FROM deposits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?
            .map(Deposit::try_from)
            .transpose()
    }

    async fn insert_deposit(
        &self,
        new_deposit: &NewDeposit,
        reference: &str,
    ) -> Result<Deposit, RepositoryError> {
        let row = sqlx::query_as::<_, DepositRow>(
            r#"
                INSERT INTO deposits (id, user_id, amount, method, reference, status)
                SELECT $1, id, $3, $4, $5, 'pending' FROM users WHERE id = $2
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&new_deposit.user_id)
        .bind(new_deposit.amount)
        .bind(new_deposit.method.as_str())
        .bind(reference)
        .fetch_optional(&self.conn)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(RepositoryError::not_found("user", &new_deposit.user_id)),
        }
    }

    async fn settle_deposit(
        &self,
        id: &str,
        decision: DepositDecision,
        processed_by: &str,
    ) -> Result<Settlement, RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, DepositRow>(
            r#"
                UPDATE deposits
                SET status = $1, processed_at = NOW(), processed_by = $2
                WHERE id = $3 AND status = 'pending'
                RETURNING *
            "#,
        )
        .bind(decision.target_status().as_str())
        .bind(processed_by)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let deposit = match row {
            Some(row) => Deposit::try_from(row)?,
            None => {
                tx.rollback().await?;
                return match self.get_deposit(id).await? {
                    Some(existing) => Err(already_settled(&existing)),
                    None => Err(RepositoryError::not_found("deposit", id)),
                };
            }
        };

        if decision == DepositDecision::Reject {
            tx.commit().await?;
            return Ok(Settlement {
                deposit,
                user: None,
                transaction: None,
            });
        }

        let user_row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET balance = balance + $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(deposit.amount)
        .bind(&deposit.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| numeric_overflow(e, balance_overflow(&deposit)))?;

        let user = match user_row {
            Some(row) => User::try_from(row)?,
            None => {
                tx.rollback().await?;
                return Err(RepositoryError::not_found("user", &deposit.user_id));
            }
        };

        let transaction_row = sqlx::query_as::<_, TransactionRow>(
            r#"
                INSERT INTO transactions (id, user_id, kind, amount, reference, status)
                VALUES ($1, $2, 'deposit', $3, $4, 'completed')
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&deposit.user_id)
        .bind(deposit.amount)
        .bind(&deposit.reference)
        .fetch_one(&mut *tx)
        .await?;
        let transaction = Transaction::try_from(transaction_row)?;

        tx.commit().await?;

        Ok(Settlement {
            deposit,
            user: Some(user),
            transaction: Some(transaction),
        })
    }
}

#[async_trait]
impl DepositRepository for MemoryStore {
    async fn list_deposits(&self) -> Result<Vec<Deposit>, RepositoryError> {
        Ok(sorted_desc(&self.deposits, |d| d.timestamp))
    }

    async fn get_deposit(&self, id: &str) -> Result<Option<Deposit>, RepositoryError> {
        Ok(self.deposits.get(id).map(|d| d.clone()))
    }

    async fn insert_deposit(
        &self,
        new_deposit: &NewDeposit,
        reference: &str,
    ) -> Result<Deposit, RepositoryError> {
        let _ledger = self.lock_ledger();

        if !self.users.contains_key(&new_deposit.user_id) {
            return Err(RepositoryError::not_found("user", &new_deposit.user_id));
        }

        let deposit = Deposit {
            id: new_id(),
            user_id: new_deposit.user_id.clone(),
            amount: new_deposit.amount,
            method: new_deposit.method,
            reference: reference.to_string(),
            status: DepositStatus::Pending,
            timestamp: Utc::now(),
            processed_at: None,
            processed_by: None,
        };
        self.deposits.insert(deposit.id.clone(), deposit.clone());

        Ok(deposit)
    }

    async fn settle_deposit(
        &self,
        id: &str,
        decision: DepositDecision,
        processed_by: &str,
    ) -> Result<Settlement, RepositoryError> {
        let _ledger = self.lock_ledger();

        let mut deposit = self
            .deposits
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| RepositoryError::not_found("deposit", id))?;
        if deposit.status.is_terminal() {
            return Err(already_settled(&deposit));
        }

        let now = Utc::now();
        let mut settlement = Settlement {
            deposit: deposit.clone(),
            user: None,
            transaction: None,
        };

        if decision == DepositDecision::Approve {
            let mut user = self
                .users
                .get_mut(&deposit.user_id)
                .ok_or_else(|| RepositoryError::not_found("user", &deposit.user_id))?;
            user.balance = user
                .balance
                .checked_add(deposit.amount)
                .ok_or_else(|| RepositoryError::Conflict(balance_overflow(&deposit)))?;
            user.updated_at = now;
            settlement.user = Some(user.clone());
            drop(user);

            let transaction = Transaction {
                id: new_id(),
                user_id: deposit.user_id.clone(),
                station_id: None,
                kind: TransactionKind::Deposit,
                fuel_type: None,
                liters: None,
                price_per_liter: None,
                amount: deposit.amount,
                reference: deposit.reference.clone(),
                status: TransactionStatus::Completed,
                timestamp: now,
            };
            self.transactions
                .insert(transaction.id.clone(), transaction.clone());
            settlement.transaction = Some(transaction);
        }

        deposit.status = decision.target_status();
        deposit.processed_at = Some(now);
        deposit.processed_by = Some(processed_by.to_string());
        self.deposits.insert(deposit.id.clone(), deposit.clone());
        settlement.deposit = deposit;

        Ok(settlement)
    }
}
