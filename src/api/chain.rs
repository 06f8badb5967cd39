use actix_web::{HttpResponse, Responder, get, post, web};
use log::warn;

use super::models::{
    AppState, ChainResponse, HeightResponse, ReconcileResponse, SubmitResponse, ValidateResponse,
};
use crate::blockchain::Block;
use crate::error::{NodeError, ValidationError};

/// Get the full chain (also the peer-facing consensus fetch).
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.read().await;
    let chain = node.chain();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

/// Current chain height (cheap consensus probe).
#[get("/chain/height/")]
pub async fn get_height(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.read().await;
    HttpResponse::Ok().json(HeightResponse {
        height: node.height(),
    })
}

/// Re-validate the local chain by full replay.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.read().await;
    let (valid, invalid_index) = match node.validate_local() {
        Ok(()) => (true, None),
        Err(ValidationError::InvalidChain { index, .. }) => (false, Some(index)),
        Err(_) => (false, None),
    };
    HttpResponse::Ok().json(ValidateResponse {
        valid,
        length: node.chain().len(),
        invalid_index,
    })
}

/// One block by index, read from the persisted store.
#[get("/block/{index}/")]
pub async fn get_block(state: web::Data<AppState>, path: web::Path<(u64,)>) -> impl Responder {
    let index = path.into_inner().0;
    let node = state.node.read().await;
    match node.block_by_index(index) {
        Ok(Some(block)) => HttpResponse::Ok().json(block),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => {
            warn!("GET /block/{index}/ - {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Persisted blocks from `start` onward, for a peer catching up.
#[get("/blocks/{start}/")]
pub async fn get_blocks_from(
    state: web::Data<AppState>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let start = path.into_inner().0;
    let node = state.node.read().await;
    match node.blocks_from(start) {
        Ok(blocks) => HttpResponse::Ok().json(blocks),
        Err(e) => {
            warn!("GET /blocks/{start}/ - {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Receive a freshly mined block from a peer.
#[post("/block/")]
pub async fn post_block(state: web::Data<AppState>, body: web::Json<Block>) -> impl Responder {
    let block = body.into_inner();
    let index = block.index;
    let mut node = state.node.write().await;
    match node.receive_block(block) {
        Ok(()) => HttpResponse::Ok().json(SubmitResponse::accepted(format!("block {index}"))),
        Err(NodeError::Validation(e)) => {
            warn!("POST /block/ - rejected block #{index}: {e}");
            HttpResponse::BadRequest().json(SubmitResponse::rejected(e.to_string()))
        }
        Err(e) => {
            warn!("POST /block/ - failed to persist block #{index}: {e}");
            HttpResponse::InternalServerError().json(SubmitResponse::rejected(e.to_string()))
        }
    }
}

/// Run one consensus round against the configured peers.
#[post("/reconcile/")]
pub async fn reconcile(state: web::Data<AppState>) -> impl Responder {
    let mut node = state.node.write().await;
    match node.reconcile(&state.peers).await {
        Ok(outcome) => HttpResponse::Ok().json(ReconcileResponse {
            outcome: outcome.as_str(),
            length: node.chain().len(),
        }),
        Err(e) => {
            warn!("POST /reconcile/ - failed: {e}");
            HttpResponse::InternalServerError().json(SubmitResponse::rejected(e.to_string()))
        }
    }
}
