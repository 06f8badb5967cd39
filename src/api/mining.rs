use actix_web::{HttpResponse, Responder, post, web};
use log::{info, warn};

use super::models::{AppState, SubmitResponse};

/// Mine one block: reconcile, aggregate peer mempools, run the
/// proof-of-work search, append and broadcast. The write guard is held
/// for the whole operation; the search itself runs on a blocking worker
/// so request threads stay responsive.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    let mut node = state.node.write().await;
    match node.mine(&state.peers).await {
        Ok(block) => {
            info!(
                "MINER - sealed block #{} (proof={}, {} transactions)",
                block.index,
                block.proof,
                block.transactions.len()
            );
            HttpResponse::Ok().json(block)
        }
        Err(e) => {
            warn!("POST /mine/ - failed: {e}");
            HttpResponse::InternalServerError().json(SubmitResponse::rejected(e.to_string()))
        }
    }
}
