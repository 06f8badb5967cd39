use std::env;
use std::path::PathBuf;

use crate::error::NodeError;

/// Node configuration loaded from the environment (`.env` supported via
/// dotenvy in `main`). The keypair identifies this node as a miner and is
/// required: without it the coinbase of a mined block cannot be signed.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub public_key: String,
    pub secret_key: String,
    pub peers: Vec<String>,
    pub chain_file: PathBuf,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, NodeError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let public_key = env::var("PUBLIC_KEY")
            .map_err(|_| NodeError::Key("PUBLIC_KEY is not set".to_string()))?;
        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| NodeError::Key("SECRET_KEY is not set".to_string()))?;

        // Comma-separated peer base URLs, e.g. "http://10.0.0.2:8080,http://10.0.0.3:8080".
        let peers = env::var("NODES")
            .unwrap_or_default()
            .split(',')
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let chain_file = env::var("CHAIN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("blockchain.blk"));

        Ok(Self {
            host,
            port,
            public_key,
            secret_key,
            peers,
            chain_file,
        })
    }
}
