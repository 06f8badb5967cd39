use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};

#[get("/balance/{public_key}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let public_key = path.into_inner().0;
    let balance = {
        let node = state.node.read().await;
        node.balance_of(&public_key)
    };
    HttpResponse::Ok().json(BalanceResponse {
        public_key,
        balance,
    })
}
