mod api;
mod blockchain;
mod config;
mod error;
mod network;
mod storage;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use blockchain::{Node, Protocol};
use config::NodeConfig;
use storage::BlockStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env().map_err(std::io::Error::other)?;
    let store = BlockStore::open(&config.chain_file);

    // A store that cannot be read or replayed halts startup: never run on
    // an empty, unverified chain.
    let node = Node::new(
        store,
        Protocol::default(),
        config.public_key.clone(),
        config.secret_key.clone(),
        config.peers.clone(),
    )
    .map_err(std::io::Error::other)?;

    info!(
        "starting node at http://{}:{} (height {}, {} peers)",
        config.host,
        config.port,
        node.height(),
        config.peers.len()
    );

    let state = web::Data::new(AppState::new(node));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
