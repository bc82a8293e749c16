use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transactions::Transaction;
use super::users::User;
use super::ValidationError;
use crate::utils::{contains_ignore_case, format_naira};

/// Largest single deposit an administrator can register, in naira.
pub const MAX_DEPOSIT_AMOUNT: i64 = 50_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Approved,
    Rejected,
}

string_enum!(DepositStatus, "deposit status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl DepositStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DepositStatus::Pending)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositMethod {
    BankTransfer,
    Cash,
    Card,
}

string_enum!(DepositMethod, "deposit method", {
    BankTransfer => "bank_transfer",
    Cash => "cash",
    Card => "card",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositDecision {
    Approve,
    Reject,
}

impl DepositDecision {
    pub fn target_status(self) -> DepositStatus {
        match self {
            DepositDecision::Approve => DepositStatus::Approved,
            DepositDecision::Reject => DepositStatus::Rejected,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub method: DepositMethod,
    pub reference: String,
    pub status: DepositStatus,
    pub timestamp: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeposit {
    pub user_id: String,
    pub amount: i64,
    pub method: DepositMethod,
    #[serde(default)]
    pub reference: Option<String>,
}

impl NewDeposit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::new("userId is required"));
        }

        if self.amount <= 0 {
            return Err(ValidationError::new("amount must be greater than zero"));
        }

        if self.amount > MAX_DEPOSIT_AMOUNT {
            return Err(ValidationError::new(format!(
                "amount must not exceed {}",
                format_naira(MAX_DEPOSIT_AMOUNT)
            )));
        }

        Ok(())
    }
}

/// Outcome of settling a pending deposit. An approval carries the credited
/// user and the ledger entry written in the same transaction.
#[derive(Clone, Debug, Serialize)]
pub struct Settlement {
    pub deposit: Deposit,
    pub user: Option<User>,
    pub transaction: Option<Transaction>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositView {
    #[serde(flatten)]
    pub deposit: Deposit,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub amount_display: String,
}

impl DepositView {
    pub fn new(deposit: Deposit, user: Option<&User>) -> Self {
        let amount_display = format_naira(deposit.amount);

        DepositView {
            deposit,
            user_name: user.map(|u| u.name.clone()),
            user_email: user.map(|u| u.email.clone()),
            amount_display,
        }
    }

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
            || self.deposit.reference.contains(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_open() {
        assert!(!DepositStatus::Pending.is_terminal());
        assert!(DepositStatus::Approved.is_terminal());
        assert!(DepositStatus::Rejected.is_terminal());
    }

    #[test]
    fn decisions_map_to_terminal_states() {
        assert_eq!(DepositDecision::Approve.target_status(), DepositStatus::Approved);
        assert_eq!(DepositDecision::Reject.target_status(), DepositStatus::Rejected);
        assert!(DepositDecision::Approve.target_status().is_terminal());
    }

    #[test]
    fn method_uses_snake_case_text() {
        assert_eq!(DepositMethod::BankTransfer.to_string(), "bank_transfer");
        assert_eq!(
            serde_json::to_string(&DepositMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
    }

    #[test]
    fn new_deposit_rejects_non_positive_amounts() {
        let mut deposit = NewDeposit {
            user_id: "u1".to_string(),
            amount: 10_000,
            method: DepositMethod::Cash,
            reference: None,
        };
        assert!(deposit.validate().is_ok());

        deposit.amount = 0;
        assert!(deposit.validate().is_err());
    }

    #[test]
    fn new_deposit_is_capped() {
        let mut deposit = NewDeposit {
            user_id: "u1".to_string(),
            amount: MAX_DEPOSIT_AMOUNT,
            method: DepositMethod::BankTransfer,
            reference: None,
        };
        assert!(deposit.validate().is_ok());

        deposit.amount = MAX_DEPOSIT_AMOUNT + 1;
        assert!(deposit.validate().is_err());

        deposit.amount = i64::MAX / 2 + 1;
        assert!(deposit.validate().is_err());
    }
}
