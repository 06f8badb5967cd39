use std::collections::HashMap;

use crate::error::ValidationError;

/// Public key -> balance mapping, in base units.
///
/// Derived state: always reconstructible by replaying the chain from an
/// empty map, and reset before every full replay. Balances never go
/// negative; a debit that would underflow fails instead of mutating.
#[derive(Debug, Clone, Default)]
pub struct WalletLedger {
    balances: HashMap<String, u64>,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of a public key, 0 when the key has never been seen.
    pub fn balance_of(&self, public_key: &str) -> u64 {
        self.balances.get(public_key).copied().unwrap_or(0)
    }

    pub fn contains(&self, public_key: &str) -> bool {
        self.balances.contains_key(public_key)
    }

    pub fn credit(&mut self, public_key: &str, amount: u64) {
        let entry = self.balances.entry(public_key.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn debit(&mut self, public_key: &str, amount: u64) -> Result<(), ValidationError> {
        match self.balances.get_mut(public_key) {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                Ok(())
            }
            _ => Err(ValidationError::InsufficientFunds),
        }
    }

    /// Clear to empty before a full chain replay.
    pub fn reset(&mut self) {
        self.balances.clear();
    }

    /// Sum of all balances, for supply reconciliation checks.
    pub fn total_supply(&self) -> u64 {
        self.balances
            .values()
            .fold(0u64, |acc, b| acc.saturating_add(*b))
    }
}
