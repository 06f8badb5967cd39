pub mod block;
pub mod hashing;
pub mod model;
pub mod validate;

pub use block::Block;
pub use model::Node;

/// Smallest representable amount. 1 coin = 100_000_000 base units.
pub const COIN: u64 = 100_000_000;

/// Base block subsidy: 50 coins, in base units.
pub const BASE_REWARD: u64 = 50 * COIN;

/// Fixed network-wide Proof-of-Work difficulty (leading zero hex chars).
/// Carried in every block and validated, never recomputed.
pub const DIFFICULTY: u32 = 4;

/// Flat minimum fee for ordinary transfers: one base unit.
pub const MIN_FEE: u64 = 1;

/// Reserved sender address of coinbase emissions.
pub const EMISSION_ADDRESS: &str = "0";

/// Protocol parameters shared by all validators. Network values are the
/// constants above; tests build cheaper instances (low difficulty).
#[derive(Debug, Clone)]
pub struct Protocol {
    pub reward: u64,
    pub difficulty: u32,
    pub min_fee: u64,
    pub emission_address: String,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            reward: BASE_REWARD,
            difficulty: DIFFICULTY,
            min_fee: MIN_FEE,
            emission_address: EMISSION_ADDRESS.to_string(),
        }
    }
}
