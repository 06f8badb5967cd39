use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::hashing::canonical_digest;
use super::{BASE_REWARD, DIFFICULTY, Protocol};
use crate::transaction::Transaction;

/// Genesis sentinel: the first block has no real predecessor to hash.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
const GENESIS_PROOF: u64 = 100;
const GENESIS_TIMESTAMP: i64 = 1_696_793_687;

/// One block of the chain. Indexes are 1-based and strictly sequential;
/// transaction order inside a block is significant because later entries
/// may spend funds credited by earlier ones. `difficult` and `reward`
/// carry the fixed protocol parameters and are validated against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    pub difficult: u32,
    pub reward: u64,
}

impl Block {
    /// The trusted seed block, identical on every node: fixed timestamp,
    /// sentinel previous_hash, no transactions, no predecessor checks.
    pub fn genesis() -> Self {
        Self {
            index: 1,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            difficult: DIFFICULTY,
            reward: BASE_REWARD,
        }
    }

    /// Assemble the successor of `previous` from a winning proof and the
    /// collected transactions, carrying the protocol's fixed parameters.
    pub fn next(
        previous: &Block,
        transactions: Vec<Transaction>,
        proof: u64,
        protocol: &Protocol,
    ) -> Self {
        Self {
            index: previous.index + 1,
            timestamp: Utc::now().timestamp(),
            transactions,
            proof,
            previous_hash: previous.digest(),
            difficult: protocol.difficulty,
            reward: protocol.reward,
        }
    }

    /// Canonical digest of the whole block, used for linkage.
    pub fn digest(&self) -> String {
        canonical_digest(self)
    }
}
