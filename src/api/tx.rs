use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};

use super::models::{AppState, MempoolResponse, SubmitResponse};
use crate::transaction::Transaction;

/// Submit a signed transaction into the mempool.
///
/// On acceptance the transaction is forwarded to the configured peers
/// best-effort; a peer that misses it will pick it up when it mines.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    let hash = tx.hash.clone();

    let peer_urls = {
        let mut node = state.node.write().await;
        if let Err(e) = node.submit_transaction(tx.clone()) {
            warn!("POST /tx/ - rejected {hash}: {e}");
            return HttpResponse::BadRequest().json(SubmitResponse::rejected(e.to_string()));
        }
        node.peers().to_vec()
    };
    info!("POST /tx/ - accepted {hash} into mempool");

    for peer in &peer_urls {
        if let Err(e) = state.peers.send_transaction(peer, &tx).await {
            debug!("transaction forward skipped: {e}");
        }
    }

    HttpResponse::Ok().json(SubmitResponse::accepted(hash))
}

/// List the current mempool as full records, so peers can mine from it.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.read().await;
    let transactions = node.pending();
    HttpResponse::Ok().json(MempoolResponse {
        size: transactions.len(),
        transactions,
    })
}
