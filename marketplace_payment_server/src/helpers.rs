use hmac::{Hmac, Mac};
use sha2::Sha256;

/// The hex-encoded HMAC-SHA256 signature of `data` under `secret`, as the courier computes it.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
