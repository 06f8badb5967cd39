use serde::Serialize;
use tokio::sync::RwLock;

use crate::blockchain::{Block, Node};
use crate::network::PeerClient;
use crate::transaction::Transaction;

/// Shared application state: the single node ledger behind one async
/// reader-writer lock, plus the outbound peer client. Mutating requests
/// (submit, receive, mine, reconcile) hold the write guard for their full
/// duration, peer I/O included; read-only queries share the read guard
/// and never observe a partial write.
pub struct AppState {
    pub node: RwLock<Node>,
    pub peers: PeerClient,
}

impl AppState {
    pub fn new(node: Node) -> Self {
        Self {
            node: RwLock::new(node),
            peers: PeerClient::new(),
        }
    }
}

/* ---------- Chain API models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct HeightResponse {
    pub height: u64,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_index: Option<u64>,
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub outcome: &'static str,
    pub length: usize,
}

/* ---------- TX API models ---------- */

#[derive(Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SubmitResponse {
    pub fn accepted(hash: String) -> Self {
        Self {
            accepted: true,
            hash: Some(hash),
            reason: None,
        }
    }

    pub fn rejected(reason: String) -> Self {
        Self {
            accepted: false,
            hash: None,
            reason: Some(reason),
        }
    }
}

#[derive(Serialize)]
pub struct MempoolResponse<'a> {
    pub size: usize,
    pub transactions: &'a [Transaction],
}

/* ---------- Balance / wallet API models ---------- */

#[derive(Serialize)]
pub struct BalanceResponse {
    pub public_key: String,
    pub balance: u64,
}

#[derive(Serialize)]
pub struct NewWalletResponse {
    pub private_key: String,
    pub public_key: String,
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::blockchain::Node;
    use crate::blockchain::validate::test_support::*;
    use crate::storage::BlockStore;

    #[actix_web::test]
    async fn read_guards_are_shared() {
        let dir = tempfile::tempdir().unwrap();
        let miner = wallet();
        let node = Node::new(
            BlockStore::open(dir.path().join("chain.blk")),
            test_protocol(),
            miner.public,
            miner.secret,
            Vec::new(),
        )
        .unwrap();
        let state = AppState::new(node);

        // Two read guards held at once: queries never block each other.
        let a = state.node.read().await;
        let b = state.node.read().await;
        assert_eq!(a.height(), b.height());
    }
}
