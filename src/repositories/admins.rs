use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::memory::MemoryStore;
use super::postgres::{unique_violation, PgStore};
use super::{new_id, RepositoryError};
use crate::models::admins::{Admin, NewAdmin};

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError>;

    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, RepositoryError>;

    async fn insert_admin(&self, new_admin: &NewAdmin) -> Result<Admin, RepositoryError>;

    /// Changes only the fields that are given.
    async fn update_admin(
        &self,
        id: &str,
        display_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<Admin>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: String,
    email: String,
    display_name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AdminRepository for PgStore {
    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT * FROM admins WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(Admin::from))
    }

    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>("SELECT * FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row.map(Admin::from))
    }

    async fn insert_admin(&self, new_admin: &NewAdmin) -> Result<Admin, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
                INSERT INTO admins (id, email, display_name, password_hash)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(new_admin.email.trim())
        .bind(&new_admin.display_name)
        .bind(&new_admin.password_hash)
        .fetch_one(&self.conn)
        .await
        .map_err(|e| unique_violation(e, format!("admin {} already exists", new_admin.email)))?;

        Ok(row.into())
    }

    async fn update_admin(
        &self,
        id: &str,
        display_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"
                UPDATE admins
                SET display_name = COALESCE($1, display_name),
                    password_hash = COALESCE($2, password_hash)
                WHERE id = $3
                RETURNING *
            "#,
        )
        .bind(display_name)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(Admin::from))
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn get_admin_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        let email = email.trim();
        Ok(self
            .admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| a.value().clone()))
    }

    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, RepositoryError> {
        Ok(self.admins.get(id).map(|a| a.clone()))
    }

    async fn insert_admin(&self, new_admin: &NewAdmin) -> Result<Admin, RepositoryError> {
        let _ledger = self.lock_ledger();

        let email = new_admin.email.trim();
        if self.admins.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(RepositoryError::Conflict(format!(
                "admin {} already exists",
                email
            )));
        }

        let admin = Admin {
            id: new_id(),
            email: email.to_string(),
            display_name: new_admin.display_name.clone(),
            password_hash: new_admin.password_hash.clone(),
            created_at: Utc::now(),
        };
        self.admins.insert(admin.id.clone(), admin.clone());

        Ok(admin)
    }

    async fn update_admin(
        &self,
        id: &str,
        display_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<Admin>, RepositoryError> {
        Ok(self.admins.get_mut(id).map(|mut admin| {
            if let Some(display_name) = display_name {
                admin.display_name = display_name.to_string();
            }
            if let Some(password_hash) = password_hash {
                admin.password_hash = password_hash.to_string();
            }
            admin.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_by_email_ignores_case() {
        let store = MemoryStore::new();
        let admin = store
            .insert_admin(&NewAdmin {
                email: "admin@fuelpay.com".to_string(),
                display_name: "Admin".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let found = store.get_admin_by_email(" ADMIN@fuelpay.com").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(admin.id.clone()));

        let updated = store
            .update_admin(&admin.id, Some("Ops Lead"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name, "Ops Lead");
        assert_eq!(updated.password_hash, "hash");
    }
}
