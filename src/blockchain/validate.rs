use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::{Block, Protocol};
use crate::error::ValidationError;
use crate::transaction::Transaction;
use crate::wallet::{WalletLedger, keys};

/// Proof-of-Work predicate: the hex SHA-256 of `"{last_proof}{proof}"`
/// must start with `difficulty` literal '0' characters.
pub fn validate_proof(last_proof: u64, proof: u64, difficulty: u32) -> bool {
    let guess = format!("{last_proof}{proof}");
    let digest = hex::encode(Sha256::digest(guess.as_bytes()));
    digest.bytes().take(difficulty as usize).all(|b| b == b'0')
}

/// Validate one transaction against the ledger and apply its effects.
///
/// Checks run to completion before any ledger write, so a rejected
/// transaction leaves the ledger untouched. The integrity hash is always
/// recomputed first: a valid signature over a forged hash field must not
/// be trusted.
///
/// `coinbase_ceiling` is the base reward, or base reward plus the block's
/// total fees when validating inside a block. A coinbase credits the
/// recipient with exactly the ceiling, not its declared amount, which caps
/// minting even if the amount were manipulated.
pub fn validate_transaction(
    wallets: &mut WalletLedger,
    transaction: &Transaction,
    coinbase_ceiling: u64,
    protocol: &Protocol,
) -> Result<(), ValidationError> {
    if transaction.compute_hash() != transaction.hash {
        return Err(ValidationError::HashMismatch);
    }
    if transaction.sender == protocol.emission_address {
        if transaction.amount > coinbase_ceiling {
            return Err(ValidationError::CoinbaseOverCeiling);
        }
        // No sender key exists; the recipient (the miner) attests the claim.
        if !keys::verify(&transaction.recipient, &transaction.signature, &transaction.hash) {
            return Err(ValidationError::BadSignature);
        }
        wallets.credit(&transaction.recipient, coinbase_ceiling);
        Ok(())
    } else {
        if transaction.fee < protocol.min_fee {
            return Err(ValidationError::FeeBelowMinimum);
        }
        let Some(total) = transaction.amount.checked_add(transaction.fee) else {
            return Err(ValidationError::InsufficientFunds);
        };
        if !wallets.contains(&transaction.sender) || wallets.balance_of(&transaction.sender) < total
        {
            return Err(ValidationError::InsufficientFunds);
        }
        if !keys::verify(&transaction.sender, &transaction.signature, &transaction.hash) {
            return Err(ValidationError::BadSignature);
        }
        wallets.debit(&transaction.sender, total)?;
        // The fee is not credited here; it flows back through the
        // block-level coinbase ceiling.
        wallets.credit(&transaction.recipient, transaction.amount);
        Ok(())
    }
}

/// Validate a block's transaction set in order against the shared ledger,
/// so a transaction may spend funds credited earlier in the same block.
/// At most one coinbase, no duplicate hashes, every entry passes
/// [`validate_transaction`]. First failure rejects the set.
pub fn validate_transactions(
    wallets: &mut WalletLedger,
    transactions: &[Transaction],
    coinbase_ceiling: u64,
    protocol: &Protocol,
) -> Result<(), ValidationError> {
    let mut coinbase_seen = false;
    let mut hashes = HashSet::new();
    for transaction in transactions {
        if transaction.sender == protocol.emission_address {
            if coinbase_seen {
                return Err(ValidationError::MultipleCoinbase);
            }
            coinbase_seen = true;
        }
        if !hashes.insert(transaction.hash.as_str()) {
            return Err(ValidationError::DuplicateTransaction);
        }
        validate_transaction(wallets, transaction, coinbase_ceiling, protocol)?;
    }
    Ok(())
}

/// Total fees of the non-coinbase transactions in a block.
pub fn sum_of_fees(block: &Block, protocol: &Protocol) -> u64 {
    block
        .transactions
        .iter()
        .filter(|t| t.sender != protocol.emission_address)
        .fold(0u64, |acc, t| acc.saturating_add(t.fee))
}

/// Validate one block against its immediate predecessor, short-circuiting
/// on the first failure: linkage, proof-of-work, sequential index, fixed
/// protocol parameters, then the transaction set with
/// `ceiling = reward + sum of fees`. Any failure rejects the whole block.
///
/// The ledger passed in is mutated by the transaction walk; callers that
/// need all-or-nothing semantics validate against a scratch copy and
/// commit it on success.
pub fn validate_block(
    block: &Block,
    previous: &Block,
    wallets: &mut WalletLedger,
    protocol: &Protocol,
) -> Result<(), ValidationError> {
    if block.previous_hash != previous.digest() {
        return Err(ValidationError::BadLinkage);
    }
    if !validate_proof(previous.proof, block.proof, protocol.difficulty) {
        return Err(ValidationError::BadProof);
    }
    if block.index != previous.index + 1 {
        return Err(ValidationError::BadIndex);
    }
    if block.reward != protocol.reward || block.difficult != protocol.difficulty {
        return Err(ValidationError::PolicyMismatch);
    }
    let ceiling = protocol.reward.saturating_add(sum_of_fees(block, protocol));
    validate_transactions(wallets, &block.transactions, ceiling, protocol)
}

/// Full replay of a candidate chain. Resets the ledger, trusts `chain[0]`
/// as the genesis baseline, then validates every successor, accumulating
/// wallet state. A single bad block invalidates the whole candidate; the
/// failing index is reported for diagnostics.
pub fn validate_chain(
    chain: &[Block],
    wallets: &mut WalletLedger,
    protocol: &Protocol,
) -> Result<(), ValidationError> {
    wallets.reset();
    let Some(genesis) = chain.first() else {
        return Err(ValidationError::EmptyChain);
    };
    let mut previous = genesis;
    for block in &chain[1..] {
        validate_block(block, previous, wallets, protocol).map_err(|reason| {
            ValidationError::InvalidChain {
                index: block.index,
                reason: Box::new(reason),
            }
        })?;
        previous = block;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::blockchain::model::proof_of_work;
    use crate::blockchain::{COIN, EMISSION_ADDRESS};
    use crate::wallet::keys;

    /// Cheap parameters for tests: difficulty 1 keeps PoW searches tiny.
    pub fn test_protocol() -> Protocol {
        Protocol {
            reward: 50 * COIN,
            difficulty: 1,
            ..Protocol::default()
        }
    }

    pub struct Wallet {
        pub secret: String,
        pub public: String,
    }

    pub fn wallet() -> Wallet {
        let (secret, public) = keys::generate_keypair();
        Wallet { secret, public }
    }

    pub fn transfer(from: &Wallet, to: &Wallet, amount: u64, fee: u64) -> Transaction {
        Transaction::new_signed(from.public.clone(), to.public.clone(), amount, fee, &from.secret)
            .unwrap()
    }

    pub fn coinbase(miner: &Wallet, amount: u64) -> Transaction {
        Transaction::new_signed(EMISSION_ADDRESS, miner.public.clone(), amount, 0, &miner.secret)
            .unwrap()
    }

    /// Mine a valid successor of `previous` holding `transactions`.
    pub fn mined_block(
        previous: &Block,
        transactions: Vec<Transaction>,
        protocol: &Protocol,
    ) -> Block {
        let proof = proof_of_work(previous.proof, protocol.difficulty);
        Block::next(previous, transactions, proof, protocol)
    }

    /// Genesis carrying the test protocol's parameters.
    pub fn test_genesis(protocol: &Protocol) -> Block {
        let mut genesis = Block::genesis();
        genesis.difficult = protocol.difficulty;
        genesis.reward = protocol.reward;
        genesis
    }

    /// A valid chain of `extra` blocks past genesis, each holding one
    /// coinbase paid to `miner`.
    pub fn test_chain(miner: &Wallet, extra: usize, protocol: &Protocol) -> Vec<Block> {
        let mut chain = vec![test_genesis(protocol)];
        for _ in 0..extra {
            let block = mined_block(
                chain.last().unwrap(),
                vec![coinbase(miner, protocol.reward)],
                protocol,
            );
            chain.push(block);
        }
        chain
    }
}
