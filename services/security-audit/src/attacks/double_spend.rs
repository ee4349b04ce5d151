//! Double spend attack simulation.
//! Simulates concurrent attempts to withdraw and place an order using the same balance,
//! verifying that optimistic locking prevents negative balances.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use types::account::{Account, AccountType, Balance};
use types::ids::AccountId;

/// Simulates a data store that enforces optimistic locking on Account updates.
pub struct AccountStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

#[derive(Debug, PartialEq)]
pub enum StoreError {
    NotFound,
    VersionConflict,
    InsufficientBalance,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, account: Account) {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.account_id, account);
    }

    pub fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.lock().unwrap().get(id).cloned()
    }

    /// Attempts to update the account, enforcing the version check.
    pub fn update(&self, mut account: Account) -> Result<(), StoreError> {
        let mut map = self.accounts.lock().unwrap();
        let existing = map.get(&account.account_id).ok_or(StoreError::NotFound)?;

        // Optimistic locking check
        if existing.version != account.version {
            return Err(StoreError::VersionConflict);
        }

        // Increment version on update
        account.version += 1;
        map.insert(account.account_id, account);
        Ok(())
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated handler for locking margin (e.g. for placing an order)
pub fn handle_order_placement(
    store: Arc<AccountStore>,
    account_id: AccountId,
    amount: Decimal,
) -> Result<(), StoreError> {
    let mut current_account = store.get(&account_id).ok_or(StoreError::NotFound)?;

    // Check balance
    let balance = current_account
        .get_balance_mut("USDC")
        .ok_or(StoreError::NotFound)?;
    if balance.available < amount {
        return Err(StoreError::InsufficientBalance);
    }

    // Mutate state (lock balance)
    balance.lock(amount);

    // Attempt to persist
    store.update(current_account)
}

/// Simulated handler for withdrawing balance
pub fn handle_withdrawal(
    store: Arc<AccountStore>,
    account_id: AccountId,
    amount: Decimal,
) -> Result<(), StoreError> {
    let mut current_account = store.get(&account_id).ok_or(StoreError::NotFound)?;

    let balance = current_account
        .get_balance_mut("USDC")
        .ok_or(StoreError::NotFound)?;
    if balance.available < amount {
        return Err(StoreError::InsufficientBalance);
    }

    // Mutate state (deduct available)
    // We simulate deduction by locking and then deducting locked
    balance.lock(amount);
    balance.deduct_locked(amount);

    // Attempt to persist
    store.update(current_account)
}
