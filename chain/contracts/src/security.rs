//! Shared security primitives for contract modules
//!
//! Provides reusable guards and access control used across vault,
//! withdrawal, and commitment modules.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use types::ids::AccountId;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A contract function acquires the guard before executing state-changing
/// logic and releases it on completion. Any nested call attempt fails.
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `true` if successfully acquired.
    /// Returns `false` if already locked (reentrancy attempt).
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the guard.
    pub fn release(&mut self) {
        self.locked = false;
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Access control roles per spec §17 (Governance Hooks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full system control
    Admin,
    /// Operational tasks (e.g., submitting roots)
    Operator,
    /// Regular user
    User,
}

/// Role-based access control manager.
///
/// Maps callers (identified by string) to their assigned roles.
/// Admin role is required for sensitive operations like pause, whitelist, etc.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<String, Role>,
    admin: String,
}

impl AccessControl {
    /// Create access control with an initial admin.
    pub fn new(admin: impl Into<String>) -> Self {
        let admin_str = admin.into();
        let mut roles = HashMap::new();
        roles.insert(admin_str.clone(), Role::Admin);
        Self {
            roles,
            admin: admin_str,
        }
    }

    /// Check if a caller has the specified role.
    pub fn has_role(&self, caller: &str, role: Role) -> bool {
        self.roles.get(caller).map_or(false, |r| *r == role)
    }

    /// Check if a caller is admin.
    pub fn is_admin(&self, caller: &str) -> bool {
        self.has_role(caller, Role::Admin)
    }

    /// Assign a role to a caller. Only admin can assign roles.
    pub fn grant_role(&mut self, admin_caller: &str, target: impl Into<String>, role: Role) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        self.roles.insert(target.into(), role);
        true
    }

    /// Remove a role from a caller. Only admin can revoke.
    pub fn revoke_role(&mut self, admin_caller: &str, target: &str) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        // Cannot revoke the primary admin
        if target == self.admin {
            return false;
        }
        self.roles.remove(target);
        true
    }

    /// Transfer admin to a new address.
    pub fn transfer_admin(&mut self, current_admin: &str, new_admin: impl Into<String>) -> bool {
        if !self.is_admin(current_admin) {
            return false;
        }
        let new_admin_str = new_admin.into();
        self.roles.remove(current_admin);
        self.roles.insert(new_admin_str.clone(), Role::Admin);
        self.admin = new_admin_str;
        true
    }

    /// Get the current admin identifier.
    pub fn admin(&self) -> &str {
        &self.admin
    }
}

/// Composable pause modifier.
///
/// When paused, protected operations must be rejected.
#[derive(Debug, Clone)]
pub struct PauseGuard {
    paused: bool,
}

impl PauseGuard {
    /// Create a new unpaused guard.
    pub fn new() -> Self {
        Self { paused: false }
    }

    /// Pause operations.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unpause operations.
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Check if currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for PauseGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-account nonce tracker for replay protection.
///
/// Each account has a monotonically increasing nonce.
/// A nonce can only be used once per account.
#[derive(Debug, Clone)]
pub struct NonceTracker {
    used_nonces: HashSet<(AccountId, u64)>,
}

impl NonceTracker {
    /// Create a new empty tracker.
    pub fn new() -> Self {
        Self {
            used_nonces: HashSet::new(),
        }
    }

    /// Check if a nonce has been used for an account.
    pub fn is_used(&self, account_id: &AccountId, nonce: u64) -> bool {
        self.used_nonces.contains(&(*account_id, nonce))
    }

    /// Mark a nonce as used. Returns `false` if already used (replay attempt).
    pub fn use_nonce(&mut self, account_id: AccountId, nonce: u64) -> bool {
        self.used_nonces.insert((account_id, nonce))
    }

    /// Number of tracked nonces.
    pub fn count(&self) -> usize {
        self.used_nonces.len()
    }
}

impl Default for NonceTracker {
    fn default() -> Self {
        Self::new()
    }
}
