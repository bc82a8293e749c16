use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::{sorted_desc, MemoryStore};
use super::postgres::{unique_violation, PgStore};
use super::{new_id, RepositoryError};
use crate::models::users::{account_number, NewUser, User, UserStatus};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Creates an active user with a zero balance and the next account number.
    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepositoryError>;

    async fn set_user_status(
        &self,
        id: &str,
        status: UserStatus,
    ) -> Result<Option<User>, RepositoryError>;

    async fn toggle_user_status(&self, id: &str) -> Result<Option<User>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    account_number: String,
    balance: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            account_number: row.account_number,
            balance: row.balance,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn email_taken(email: &str) -> String {
    format!("email {} is already registered", email)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.conn)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
                INSERT INTO users (id, name, email, phone, account_number, balance, status)
                VALUES ($1, $2, $3, $4, 'ZQ' || nextval('account_number_seq'), 0, 'active')
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(new_user.name.trim())
        .bind(new_user.email.trim())
        .bind(new_user.phone.trim())
        .fetch_one(&self.conn)
        .await
        .map_err(|e| unique_violation(e, email_taken(&new_user.email)))?;

        row.try_into()
    }

    async fn set_user_status(
        &self,
        id: &str,
        status: UserStatus,
    ) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.conn)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn toggle_user_status(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r#"
                UPDATE users
                SET status = CASE status WHEN 'active' THEN 'suspended' ELSE 'active' END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.conn)
        .await?
        .map(User::try_from)
        .transpose()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(sorted_desc(&self.users, |u| u.created_at))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let _ledger = self.lock_ledger();

        let email = new_user.email.trim();
        if self
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(RepositoryError::Conflict(email_taken(email)));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: new_user.name.trim().to_string(),
            email: email.to_string(),
            phone: new_user.phone.trim().to_string(),
            account_number: account_number(self.next_account_sequence()),
            balance: 0,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn set_user_status(
        &self,
        id: &str,
        status: UserStatus,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get_mut(id).map(|mut user| {
            user.status = status;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn toggle_user_status(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get_mut(id).map(|mut user| {
            user.status = user.status.toggled();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: "+2348012345678".to_string(),
        }
    }

    #[tokio::test]
    async fn assigns_sequential_account_numbers() {
        let store = MemoryStore::new();

        let first = store.insert_user(&new_user("John Doe", "john@example.com")).await.unwrap();
        let second = store.insert_user(&new_user("Jane Smith", "jane@example.com")).await.unwrap();

        assert_eq!(first.account_number, "ZQ100001");
        assert_eq!(second.account_number, "ZQ100002");
        assert_eq!(first.balance, 0);
        assert_eq!(first.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(&new_user("John Doe", "john@example.com")).await.unwrap();

        let result = store.insert_user(&new_user("Johnny", "JOHN@example.com")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn toggle_twice_restores_status() {
        let store = MemoryStore::new();
        let user = store.insert_user(&new_user("John Doe", "john@example.com")).await.unwrap();

        let once = store.toggle_user_status(&user.id).await.unwrap().unwrap();
        assert_eq!(once.status, UserStatus::Suspended);

        let twice = store.toggle_user_status(&user.id).await.unwrap().unwrap();
        assert_eq!(twice.status, UserStatus::Active);

        assert!(store.toggle_user_status("missing").await.unwrap().is_none());
    }
}
