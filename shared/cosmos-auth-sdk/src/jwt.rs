//! Access token expiry decoding
//!
//! The signature is never checked here; the API does that. Only the `exp`
//! claim is read to decide when to log in again.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

/// Tokens expiring within this many seconds are refreshed
pub const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Expiry (seconds since epoch) from a JWT's payload segment
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Some(claim.exp)
}

/// True when fewer than [`REFRESH_MARGIN_SECS`] remain before `exp`
pub fn needs_refresh(exp: i64, now_epoch_secs: i64) -> bool {
    exp - now_epoch_secs < REFRESH_MARGIN_SECS
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
    }

    pub fn token_expiring_at(exp: i64) -> String {
        encode(
            &Header::default(),
            &Claims { sub: "operator", exp },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }
}
