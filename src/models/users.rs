use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, ValidationError};
use crate::utils::contains_ignore_case;

/// First account number handed out by a fresh store.
pub const ACCOUNT_NUMBER_START: i64 = 100_001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
}

string_enum!(UserStatus, "user status", {
    Active => "active",
    Suspended => "suspended",
});

impl UserStatus {
    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Suspended,
            UserStatus::Suspended => UserStatus::Active,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_number: String,
    pub balance: i64,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name and email match case-insensitively, phone and account number as
    /// plain substrings.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        contains_ignore_case(&self.name, query)
            || contains_ignore_case(&self.email, query)
            || self.phone.contains(query)
            || self.account_number.contains(query)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("phone", &self.phone)?;

        if !self.email.contains('@') {
            return Err(ValidationError::new("email is not valid"));
        }

        Ok(())
    }
}

pub fn account_number(sequence: i64) -> String {
    format!("ZQ{}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str, phone: &str) -> User {
        User {
            id: "u1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            account_number: account_number(ACCOUNT_NUMBER_START),
            balance: 15_000,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_toggle_round_trips() {
        for status in [UserStatus::Active, UserStatus::Suspended] {
            assert_ne!(status.toggled(), status);
            assert_eq!(status.toggled().toggled(), status);
        }
    }

    #[test]
    fn status_parses_its_own_text() {
        assert_eq!("suspended".parse::<UserStatus>().unwrap(), UserStatus::Suspended);
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn matches_name_and_email_case_insensitively() {
        let user = user("John Doe", "john@example.com", "+2348012345678");

        assert!(user.matches("JOHN"));
        assert!(user.matches("Example.COM"));
        assert!(user.matches("0123"));
        assert!(user.matches("ZQ1000"));
        assert!(user.matches("   "));
        assert!(!user.matches("jane"));
    }

    #[test]
    fn new_user_requires_fields() {
        let mut new_user = NewUser {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+234".to_string(),
        };
        assert!(new_user.validate().is_ok());

        new_user.email = "jane".to_string();
        assert!(new_user.validate().is_err());

        new_user.name = " ".to_string();
        assert_eq!(new_user.validate().unwrap_err().to_string(), "name is required");
    }
}
