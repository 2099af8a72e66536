// Account API gateway
// One request/response exchange per operation - no retries; every failure is
// classified once and handed to the caller

use anyhow::Context;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::types::{
    AuthResponse, ExistingUserResponse, GoogleExchangeResponse, GoogleLinkRequest,
    GoogleRegisterRequest, LoginRequest, RegisterRequest,
};
use crate::error::{classify_response, AuthError, Result};
use crate::identity::IdentityAssertion;
use crate::session::TokenStore;

/// Server-side marker for an unverified account
const NOT_VERIFIED_BODY: &str = "User is not verified";

/// Server-side marker for an email collision with an unlinked local account
const USER_EXISTS_BODY: &str = "User already exists";

/// Outcome of a successful Google credential exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleLogin {
    /// The identity is already linked to a local account - logged straight in
    LoggedIn { access_token: String },

    /// No local account is linked to this identity yet; the caller must
    /// collect a username before registering
    Unlinked { google_id: String, email: String },
}

/// Client for the account API's authentication endpoints.
///
/// The cookie jar holds the HttpOnly refresh-token cookie set on login, so
/// `refresh_token` and `logout` behave like the browser's credentialed calls.
pub struct AuthGateway {
    client: Client,
    base_url: String,
}

impl AuthGateway {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .user_agent(user_agent())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Credential login. Returns the access token.
    ///
    /// A 403 whose body marks the account as unverified is distinguished so
    /// the caller can offer to resend the verification email; every other
    /// client error collapses into `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: AuthResponse = response.json().await?;
            return Ok(body.access_token);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Login failed for '{}': {} - {}", username, status, body);

        Err(match status {
            StatusCode::FORBIDDEN if body == NOT_VERIFIED_BODY => {
                AuthError::NotVerified(username.to_string())
            }
            s if s.is_client_error() => AuthError::InvalidCredentials,
            _ => AuthError::Server {
                status: status.as_u16(),
                message: body,
            },
        })
    }

    /// Create a new local account. The server answers with a plain-text
    /// acknowledgement; verification happens out of band via email.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            return Ok(body);
        }

        tracing::warn!("Registration failed for '{}': {} - {}", username, status, body);
        Err(classify_response(status, body))
    }

    /// Exchange a Google identity assertion.
    ///
    /// Success means either a direct login (token present) or an unlinked
    /// identity (provider id + email present). An email collision with an
    /// unlinked local account surfaces as `AlreadyExists`.
    pub async fn login_with_google(&self, assertion: &IdentityAssertion) -> Result<GoogleLogin> {
        let response = self
            .client
            .post(self.url("/auth/google"))
            .body(assertion.as_str().to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: GoogleExchangeResponse = response.json().await?;
            return match body {
                GoogleExchangeResponse {
                    access_token: Some(access_token),
                    ..
                } => Ok(GoogleLogin::LoggedIn { access_token }),
                GoogleExchangeResponse {
                    google_id: Some(google_id),
                    email: Some(email),
                    ..
                } => Ok(GoogleLogin::Unlinked { google_id, email }),
                _ => Err(AuthError::Server {
                    status: status.as_u16(),
                    message: "Google exchange carried neither a token nor an identity".to_string(),
                }),
            };
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Google exchange failed: {} - {}", status, body);

        Err(if status.is_client_error() && body == USER_EXISTS_BODY {
            AuthError::AlreadyExists
        } else {
            classify_response(status, body)
        })
    }

    /// Create a local account bound to the asserted identity and the chosen
    /// username. Returns the access token.
    pub async fn register_with_google(
        &self,
        assertion: &IdentityAssertion,
        username: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/google/register"))
            .bearer_auth(assertion.as_str())
            .json(&GoogleRegisterRequest {
                username: username.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: AuthResponse = response.json().await?;
            return Ok(body.access_token);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            "Google registration failed for '{}': {} - {}",
            username,
            status,
            body
        );
        Err(classify_response(status, body))
    }

    /// Username of the local account whose email collides with the asserted
    /// identity, for display in the link-confirmation prompt.
    pub async fn existing_google_user(&self, assertion: &IdentityAssertion) -> Result<String> {
        let response = self
            .client
            .get(self.url("/auth/google/user"))
            .bearer_auth(assertion.as_str())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: ExistingUserResponse = response.json().await?;
            return Ok(body.username);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Existing-user lookup failed: {} - {}", status, body);
        Err(classify_response(status, body))
    }

    /// Link the asserted identity to the existing local account sharing its
    /// email, after proving the account's password. Returns the access token.
    pub async fn link_google_account(
        &self,
        assertion: &IdentityAssertion,
        password: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/google/link"))
            .bearer_auth(assertion.as_str())
            .json(&GoogleLinkRequest {
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: AuthResponse = response.json().await?;
            return Ok(body.access_token);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Account linking failed: {} - {}", status, body);

        // The link endpoint reports a wrong password as a 400, not a 401
        Err(if status == StatusCode::BAD_REQUEST && body == "Invalid credentials" {
            AuthError::InvalidCredentials
        } else {
            classify_response(status, body)
        })
    }

    /// Obtain a fresh access token via the refresh-token cookie.
    pub async fn refresh_token(&self) -> Result<String> {
        let response = self.client.post(self.url("/refresh-token")).send().await?;

        let status = response.status();
        if status.is_success() {
            let body: AuthResponse = response.json().await?;
            return Ok(body.access_token);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Token refresh failed: {} - {}", status, body);
        Err(classify_response(status, body))
    }

    /// End the session.
    ///
    /// The local token is cleared unconditionally before the network call;
    /// server-side invalidation is best effort and never blocks teardown.
    pub async fn logout(&self, store: &TokenStore) -> Result<()> {
        let token = store.read().unwrap_or_default();
        store.clear().context("Failed to clear local session")?;

        let mut request = self.client.post(self.url("/logout"));
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Server-side logout acknowledged");
            }
            Ok(response) => {
                tracing::warn!("Server-side logout rejected: {}", response.status());
            }
            Err(e) => {
                tracing::warn!("Server-side logout unreachable: {}", e);
            }
        }

        Ok(())
    }
}

/// User-Agent carrying the crate version and a hashed machine fingerprint
fn user_agent() -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let mut hasher = DefaultHasher::new();
    hostname.hash(&mut hasher);
    format!("login-client/{}-{:x}", env!("CARGO_PKG_VERSION"), hasher.finish())
}
