use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};

use crate::error::NodeError;

/// Generate a new secp256k1 keypair and return (secret_hex, public_b64).
/// The secret is the raw 32-byte scalar in hex; the public key is the
/// uncompressed point, base64-encoded, and doubles as the wallet address.
/// Offline utility, never called inside validation.
pub fn generate_keypair() -> (String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    let secret_hex = hex::encode(sk.secret_bytes());
    let public_b64 = B64.encode(pk.serialize_uncompressed());
    (secret_hex, public_b64)
}

/// ECDSA signs over the SHA-256 digest of the UTF-8 message bytes.
fn message_digest(message: &str) -> Message {
    let digest = Sha256::digest(message.as_bytes());
    Message::from_digest_slice(&digest).expect("sha256 digest is 32 bytes")
}

/// Sign `message` with a hex-encoded secret key; returns the compact
/// 64-byte signature as base64 transport text.
pub fn sign(secret_hex: &str, message: &str) -> Result<String, NodeError> {
    let bytes = hex::decode(secret_hex).map_err(|e| NodeError::Key(e.to_string()))?;
    let sk = SecretKey::from_slice(&bytes).map_err(|e| NodeError::Key(e.to_string()))?;
    let secp = Secp256k1::signing_only();
    let sig = secp.sign_ecdsa(&message_digest(message), &sk);
    Ok(B64.encode(sig.serialize_compact()))
}

/// Verify a base64 compact signature of `message` under a base64 public key.
/// Any malformed input (bad base64, bad curve point, bad signature bytes)
/// yields `false` rather than an error.
pub fn verify(public_b64: &str, signature_b64: &str, message: &str) -> bool {
    let Ok(pk_bytes) = B64.decode(public_b64) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_slice(&pk_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = B64.decode(signature_b64) else {
        return false;
    };
    let Ok(sig) = Signature::from_compact(&sig_bytes) else {
        return false;
    };
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message_digest(message), &sig, &pk).is_ok()
}
