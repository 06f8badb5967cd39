use actix_web::{HttpResponse, Responder, post};

use super::models::NewWalletResponse;
use crate::wallet::keys;

/// Generate a fresh keypair. Offline utility: the node never stores the
/// result, so save the credentials or the wallet cannot be recovered.
#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let (private_key, public_key) = keys::generate_keypair();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key,
        public_key,
    })
}
