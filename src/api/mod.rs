mod balance;
mod chain;
mod health;
mod mining;
pub mod models;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::get_height)
            .service(chain::validate_chain)
            .service(chain::get_block)
            .service(chain::get_blocks_from)
            .service(chain::post_block)
            .service(chain::reconcile)
            .service(tx::post_transaction)
            .service(tx::get_mempool)
            .service(mining::mine_block)
            .service(balance::get_balance)
            .service(stats::get_stats)
            .service(wallet::create_wallet),
    );
}
