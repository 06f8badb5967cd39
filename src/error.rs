use thiserror::Error;

/// Reasons a transaction, block or chain fails validation.
///
/// Every variant is recoverable: the offending record is rejected and the
/// reason is reported to the caller, nothing crashes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("transaction hash does not match its contents")]
    HashMismatch,
    #[error("signature verification failed")]
    BadSignature,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("fee below protocol minimum")]
    FeeBelowMinimum,
    #[error("duplicate transaction hash")]
    DuplicateTransaction,
    #[error("more than one coinbase transaction in block")]
    MultipleCoinbase,
    #[error("coinbase amount exceeds ceiling")]
    CoinbaseOverCeiling,
    #[error("coinbase transaction not allowed outside a block")]
    UnexpectedCoinbase,
    #[error("previous_hash does not match predecessor")]
    BadLinkage,
    #[error("proof of work does not satisfy difficulty")]
    BadProof,
    #[error("block index is not sequential")]
    BadIndex,
    #[error("block declares non-protocol reward or difficulty")]
    PolicyMismatch,
    #[error("chain has no genesis block")]
    EmptyChain,
    #[error("invalid chain at block {index}: {reason}")]
    InvalidChain {
        index: u64,
        reason: Box<ValidationError>,
    },
}

/// Node-level failures. Validation rejections are wrapped; storage and
/// keypair errors at startup are the only fatal ones.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),
    #[error("key error: {0}")]
    Key(String),
    #[error("worker error: {0}")]
    Runtime(String),
}
