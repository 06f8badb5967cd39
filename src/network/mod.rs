use serde::Deserialize;

use crate::blockchain::Block;
use crate::error::NodeError;
use crate::transaction::Transaction;

#[derive(Deserialize)]
struct HeightPayload {
    height: u64,
}

#[derive(Deserialize)]
struct ChainPayload {
    chain: Vec<Block>,
}

#[derive(Deserialize)]
struct MempoolPayload {
    transactions: Vec<Transaction>,
}

/// HTTP client for the peer-facing endpoints of other nodes.
///
/// No timeout and no retry: a slow, erroring or unreachable peer is
/// reported as `PeerUnavailable` and the caller treats it as absent for
/// that round.
#[derive(Debug, Clone, Default)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn chain_height(&self, peer: &str) -> Result<u64, NodeError> {
        let payload: HeightPayload = self
            .get_json(peer, &format!("{peer}/api/v1/chain/height/"))
            .await?;
        Ok(payload.height)
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, NodeError> {
        let payload: ChainPayload = self.get_json(peer, &format!("{peer}/api/v1/chain/")).await?;
        Ok(payload.chain)
    }

    pub async fn pending_transactions(&self, peer: &str) -> Result<Vec<Transaction>, NodeError> {
        let payload: MempoolPayload = self
            .get_json(peer, &format!("{peer}/api/v1/mempool/"))
            .await?;
        Ok(payload.transactions)
    }

    pub async fn send_block(&self, peer: &str, block: &Block) -> Result<(), NodeError> {
        self.post_json(peer, &format!("{peer}/api/v1/block/"), block)
            .await
    }

    pub async fn send_transaction(
        &self,
        peer: &str,
        transaction: &Transaction,
    ) -> Result<(), NodeError> {
        self.post_json(peer, &format!("{peer}/api/v1/tx/"), transaction)
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        peer: &str,
        url: &str,
    ) -> Result<T, NodeError> {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(peer, &e))?
            .json()
            .await
            .map_err(|e| unavailable(peer, &e))
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        peer: &str,
        url: &str,
        body: &B,
    ) -> Result<(), NodeError> {
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(peer, &e))?;
        Ok(())
    }
}

fn unavailable(peer: &str, err: &reqwest::Error) -> NodeError {
    NodeError::PeerUnavailable(format!("{peer}: {err}"))
}
