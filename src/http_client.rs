// Authenticated requests to the protected API origin
// Attaches the stored bearer token uniformly; never mutates the token store

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::session::TokenStore;

/// HTTP client for calls that may require authorization.
///
/// Every request to the API origin gets the current token attached as a
/// bearer header; when no token is stored the header is omitted and the
/// remote end decides. There is no refresh-on-401 loop here - an
/// authorization failure is returned to the caller as-is.
pub struct AuthenticatedClient {
    client: Client,
    store: Arc<TokenStore>,
    base_url: String,
}

impl AuthenticatedClient {
    pub fn new(
        store: Arc<TokenStore>,
        base_url: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            store,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a request against the API origin with the current bearer token
    /// attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));

        match self.store.read() {
            Ok(Some(token)) => builder = builder.bearer_auth(token),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Token store read failed, sending unauthenticated: {}", e);
            }
        }

        builder
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}
