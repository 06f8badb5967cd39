use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;

use super::models::AppState;

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: u64,
    pub mempool_size: usize,
    pub total_supply: u64,
    pub peers: usize,
}

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.read().await;
    HttpResponse::Ok().json(StatsResponse {
        height: node.height(),
        mempool_size: node.pending().len(),
        total_supply: node.total_supply(),
        peers: node.peers().len(),
    })
}
