use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::models::{
    admins::Admin, deposits::Deposit, qr_codes::QrCode, stations::Station,
    transactions::Transaction, users::User, users::ACCOUNT_NUMBER_START,
};

/// Process-local datastore. Single-record updates go through the map shards;
/// anything touching more than one record holds the ledger lock.
pub struct MemoryStore {
    pub(super) users: DashMap<String, User>,
    pub(super) deposits: DashMap<String, Deposit>,
    pub(super) transactions: DashMap<String, Transaction>,
    pub(super) stations: DashMap<String, Station>,
    pub(super) qr_codes: DashMap<String, QrCode>,
    pub(super) admins: DashMap<String, Admin>,
    account_sequence: AtomicI64,
    ledger: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            users: DashMap::new(),
            deposits: DashMap::new(),
            transactions: DashMap::new(),
            stations: DashMap::new(),
            qr_codes: DashMap::new(),
            admins: DashMap::new(),
            account_sequence: AtomicI64::new(ACCOUNT_NUMBER_START),
            ledger: Mutex::new(()),
        }
    }

    pub(super) fn lock_ledger(&self) -> MutexGuard<'_, ()> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn next_account_sequence(&self) -> i64 {
        self.account_sequence.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

/// Clones every value out of a map, newest first by `key`.
pub(super) fn sorted_desc<V, K, F>(map: &DashMap<String, V>, key: F) -> Vec<V>
where
    V: Clone,
    K: Ord,
    F: Fn(&V) -> K,
{
    let mut values: Vec<V> = map.iter().map(|entry| entry.value().clone()).collect();
    values.sort_by(|a, b| key(b).cmp(&key(a)));
    values
}
