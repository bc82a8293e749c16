use serde::Serialize;

use super::deposits::{Deposit, DepositStatus};
use super::qr_codes::QrCode;
use super::stations::Station;
use super::transactions::{Transaction, TransactionView};
use super::users::User;
use crate::utils::{format_liters, format_naira};

pub const RECENT_TRANSACTIONS: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_transactions: usize,
    pub total_revenue: i64,
    pub total_fuel_volume: f64,
    pub total_stations: usize,
    pub active_stations: usize,
    pub total_qr_codes: usize,
    pub pending_deposits: usize,
}

impl DashboardStats {
    /// Revenue and volume only count completed fuel purchases; deposit credits
    /// are not revenue.
    pub fn compute(
        users: &[User],
        transactions: &[Transaction],
        stations: &[Station],
        qr_codes: &[QrCode],
        deposits: &[Deposit],
    ) -> Self {
        let completed = transactions.iter().filter(|t| t.is_completed_purchase());
        let (total_revenue, total_fuel_volume) = completed.fold((0_i64, 0_f64), |(sum, vol), t| {
            (sum + t.amount, vol + t.liters.unwrap_or(0.0))
        });

        DashboardStats {
            total_users: users.len(),
            active_users: users.iter().filter(|u| u.is_active()).count(),
            total_transactions: transactions.len(),
            total_revenue,
            total_fuel_volume,
            total_stations: stations.len(),
            active_stations: stations.iter().filter(|s| s.is_active()).count(),
            total_qr_codes: qr_codes.len(),
            pending_deposits: deposits
                .iter()
                .filter(|d| d.status == DepositStatus::Pending)
                .count(),
        }
    }
}

/// Newest first, at most `limit` entries.
pub fn most_recent(transactions: &[Transaction], limit: usize) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(limit);
    sorted
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDisplay {
    pub total_users: String,
    pub active_users: String,
    pub revenue: String,
    pub fuel_volume: String,
    pub active_stations: String,
}

impl From<&DashboardStats> for DashboardDisplay {
    fn from(stats: &DashboardStats) -> Self {
        DashboardDisplay {
            total_users: crate::utils::group_thousands(stats.total_users as u64),
            active_users: format!("{} active", stats.active_users),
            revenue: format_naira(stats.total_revenue),
            fuel_volume: format_liters(stats.total_fuel_volume),
            active_stations: format!("{} active", stats.active_stations),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub display: DashboardDisplay,
    pub recent_transactions: Vec<TransactionView>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::stations::FuelType;
    use crate::models::transactions::{TransactionKind, TransactionStatus};

    fn transaction(
        id: &str,
        kind: TransactionKind,
        status: TransactionStatus,
        amount: i64,
        liters: Option<f64>,
        minutes_ago: i64,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            station_id: None,
            kind,
            fuel_type: liters.map(|_| FuelType::Petrol),
            liters,
            price_per_liter: liters.map(|_| 180),
            amount,
            reference: format!("TRX-{}", id),
            status,
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn revenue_counts_completed_purchases_only() {
        let transactions = vec![
            transaction(
                "1",
                TransactionKind::FuelPurchase,
                TransactionStatus::Completed,
                4_500,
                Some(25.0),
                1,
            ),
            transaction("2", TransactionKind::Deposit, TransactionStatus::Completed, 10_000, None, 2),
            transaction(
                "3",
                TransactionKind::FuelPurchase,
                TransactionStatus::Failed,
                900,
                Some(5.0),
                3,
            ),
        ];

        let stats = DashboardStats::compute(&[], &transactions, &[], &[], &[]);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.total_revenue, 4_500);
        assert_eq!(stats.total_fuel_volume, 25.0);
    }

    #[test]
    fn most_recent_is_newest_first_and_bounded() {
        let transactions: Vec<Transaction> = (0..8)
            .map(|i| {
                let id = i.to_string();
                transaction(&id, TransactionKind::Deposit, TransactionStatus::Completed, 1, None, i)
            })
            .collect();

        let recent = most_recent(&transactions, RECENT_TRANSACTIONS);
        let ids: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn display_formats_money_and_volume() {
        let stats = DashboardStats {
            total_users: 1_250,
            total_revenue: 1_234_567,
            total_fuel_volume: 1_049.6,
            ..DashboardStats::default()
        };

        let display = DashboardDisplay::from(&stats);
        assert_eq!(display.total_users, "1,250");
        assert_eq!(display.revenue, "₦1,234,567");
        assert_eq!(display.fuel_volume, "1,050L");
    }
}
