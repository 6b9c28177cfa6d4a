use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

/// Window in which a reset token stays redeemable.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

/// A freshly generated reset token. The raw value goes out by email exactly
/// once; only the hash and expiry are ever persisted.
#[derive(Debug)]
pub struct GeneratedToken {
    pub raw: String,
    pub hash: String,
    pub expires: OffsetDateTime,
}

pub fn generate() -> GeneratedToken {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    let raw = hex::encode(buf);
    let hash = hash_token(&raw);
    GeneratedToken {
        raw,
        hash,
        expires: OffsetDateTime::now_utc() + RESET_TOKEN_TTL,
    }
}

/// One-way hash of the raw token, matching what `generate` persisted.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Redeem a presented raw token against the stored hash/expiry fields.
/// Valid only if the hashes match and the expiry has not passed. On success
/// the fields are cleared in place, so a second redemption fails; the caller
/// persists the cleared state together with the new credentials.
pub fn consume(
    raw: &str,
    stored_hash: &mut Option<String>,
    stored_expires: &mut Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> bool {
    let (Some(hash), Some(expires)) = (stored_hash.as_deref(), *stored_expires) else {
        return false;
    };
    if now >= expires || hash != hash_token(raw) {
        return false;
    }
    *stored_hash = None;
    *stored_expires = None;
    true
}
