// JWT payload decoding
// Advisory expiry inspection only - no signature verification is performed

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Claims of interest from a token payload
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry as seconds since the Unix epoch
    pub exp: Option<i64>,

    /// Subject (username) the token was issued for
    pub sub: Option<String>,
}

/// Decode the payload segment of a JWT without verifying the signature.
///
/// Returns `None` for anything that is not a three-part token with a
/// base64url-encoded JSON payload. The remote API is the authority on
/// acceptance either way.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry instant embedded in the token, if it carries one.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_claims(token)?.exp?;
    Utc.timestamp_opt(exp, 0).single()
}

/// True when the embedded expiry lies in the future.
///
/// Fails closed: malformed tokens and tokens without an exp claim count
/// as expired.
pub fn is_unexpired(token: &str) -> bool {
    match expires_at(token) {
        Some(exp) => Utc::now() < exp,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Build an unsigned test token with the given payload JSON
    fn token_with_payload(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_decode_well_formed() {
        let token = token_with_payload(r#"{"sub":"alice","exp":1767225600}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.exp, Some(1767225600));
    }

    #[test]
    fn test_decode_rejects_wrong_part_count() {
        assert!(decode_claims("only-one-part").is_none());
        assert!(decode_claims("two.parts").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode_claims("header.!!not-base64!!.sig").is_none());
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode(b"not json at all");
        assert!(decode_claims(&format!("h.{}.s", payload)).is_none());
    }

    #[test]
    fn test_future_expiry_is_unexpired() {
        let exp = Utc::now().timestamp() + 3600;
        let token = token_with_payload(&format!(r#"{{"exp":{}}}"#, exp));
        assert!(is_unexpired(&token));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let exp = Utc::now().timestamp() - 60;
        let token = token_with_payload(&format!(r#"{{"exp":{}}}"#, exp));
        assert!(!is_unexpired(&token));
    }

    #[test]
    fn test_missing_exp_fails_closed() {
        let token = token_with_payload(r#"{"sub":"alice"}"#);
        assert!(!is_unexpired(&token));
    }

    #[test]
    fn test_malformed_token_fails_closed() {
        assert!(!is_unexpired("garbage"));
        assert!(!is_unexpired(""));
    }

    proptest! {
        // Decoding must never panic, whatever the input looks like
        #[test]
        fn decode_never_panics(input in "\\PC*") {
            let _ = decode_claims(&input);
            let _ = is_unexpired(&input);
        }

        #[test]
        fn exp_roundtrip(exp in 0i64..4_102_444_800) {
            let token = token_with_payload(&format!(r#"{{"exp":{}}}"#, exp));
            prop_assert_eq!(decode_claims(&token).unwrap().exp, Some(exp));
        }
    }
}
