// Session state derivation
// Presence plus unexpired payload is the sole client-side authority for
// "authenticated"; the remote API remains the real one

use std::sync::Arc;

use super::claims;
use super::store::TokenStore;

/// Advisory view over the token store.
///
/// A `true` answer only means a request is worth attempting - the server
/// can still reject the token, and that failure is handled upstream.
pub struct SessionOracle {
    store: Arc<TokenStore>,
}

impl SessionOracle {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }

    /// True iff a token is present and its embedded expiry is in the future.
    ///
    /// Malformed tokens and storage failures fail closed to `false`.
    pub fn is_authenticated(&self) -> bool {
        match self.store.read() {
            Ok(Some(token)) => claims::is_unexpired(&token),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Token store read failed: {}", e);
                false
            }
        }
    }

    /// Username claim from the stored token, for display purposes.
    pub fn current_subject(&self) -> Option<String> {
        let token = self.store.read().ok().flatten()?;
        claims::decode_claims(&token)?.sub
    }

    /// Expiry of the stored token, if one is present and decodable.
    pub fn session_expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let token = self.store.read().ok().flatten()?;
        claims::expires_at(&token)
    }
}
