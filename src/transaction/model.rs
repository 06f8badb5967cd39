use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::blockchain::hashing::canonical_digest;
use crate::error::NodeError;
use crate::wallet::keys;

/// A signed transfer, immutable once created.
///
/// `hash` is a pure function of the five core fields (sender, recipient,
/// amount, fee, timestamp) in canonical form; it excludes itself and the
/// signature. The signature covers the hash string, under the sender's key
/// for transfers and the recipient's key for coinbase emissions. Consumers
/// must recompute the hash before trusting the signature.
///
/// Amounts and fees are in base units: 1 coin = 100_000_000 units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: i64,
    pub hash: String,
    pub signature: String,
}

impl Transaction {
    /// Build and sign a transaction with the given secret key. For an
    /// ordinary transfer the secret belongs to the sender; for a coinbase
    /// (sender = emission address) it belongs to the recipient, the miner
    /// attesting its own claim.
    pub fn new_signed(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        fee: u64,
        secret_hex: &str,
    ) -> Result<Self, NodeError> {
        let mut tx = Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            fee,
            timestamp: Utc::now().timestamp_millis(),
            hash: String::new(),
            signature: String::new(),
        };
        tx.hash = tx.compute_hash();
        tx.signature = keys::sign(secret_hex, &tx.hash)?;
        Ok(tx)
    }

    /// Recompute the integrity hash from the core fields only.
    pub fn compute_hash(&self) -> String {
        canonical_digest(&serde_json::json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": self.amount,
            "fee": self.fee,
            "timestamp": self.timestamp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::Transaction;
    use crate::wallet::keys;

    #[test]
    fn new_signed_hash_matches_contents() {
        let (sk, pk) = keys::generate_keypair();
        let (_, to) = keys::generate_keypair();
        let tx = Transaction::new_signed(pk.clone(), to, 100, 1, &sk).unwrap();
        assert_eq!(tx.hash, tx.compute_hash());
        assert!(keys::verify(&pk, &tx.signature, &tx.hash));
    }

    #[test]
    fn hash_excludes_signature() {
        let (sk, pk) = keys::generate_keypair();
        let (_, to) = keys::generate_keypair();
        let mut tx = Transaction::new_signed(pk, to, 100, 1, &sk).unwrap();
        let before = tx.compute_hash();
        tx.signature = String::from("forged");
        assert_eq!(tx.compute_hash(), before);
    }

    #[test]
    fn mutating_amount_breaks_hash() {
        let (sk, pk) = keys::generate_keypair();
        let (_, to) = keys::generate_keypair();
        let mut tx = Transaction::new_signed(pk, to, 100, 1, &sk).unwrap();
        tx.amount = 1_000_000;
        assert_ne!(tx.hash, tx.compute_hash());
    }
}
