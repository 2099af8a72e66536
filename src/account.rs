// Account service calls
// Recovery, verification and profile operations; all routed through the
// authenticated client so header handling stays uniform

use serde::{Deserialize, Serialize};

use crate::error::{classify_response, Result};
use crate::http_client::AuthenticatedClient;

/// Profile of the signed-in account
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub enabled: bool,
}

#[derive(Serialize)]
struct EmailRequest {
    email: String,
}

#[derive(Serialize)]
struct UsernameRequest {
    username: String,
}

#[derive(Serialize)]
struct TokenRequest {
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    new_password: String,
}

/// Client for the account API's user-facing service endpoints.
pub struct AccountClient {
    http: AuthenticatedClient,
}

impl AccountClient {
    pub fn new(http: AuthenticatedClient) -> Self {
        Self { http }
    }

    /// Profile of the currently signed-in account.
    pub async fn profile(&self) -> Result<UserProfile> {
        let response = self.http.get("/users").send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Profile fetch failed: {} - {}", status, body);
        Err(classify_response(status, body))
    }

    /// Resend the verification email for a username.
    pub async fn resend_verification(&self, username: &str) -> Result<()> {
        self.ack(
            self.http
                .post("/users/resend-verification")
                .json(&UsernameRequest {
                    username: username.to_string(),
                }),
        )
        .await
    }

    /// Resend the verification email, addressed via an expired or stale
    /// verification token instead of a username.
    pub async fn resend_verification_with_token(&self, token: &str) -> Result<()> {
        self.ack(
            self.http
                .post("/users/resend-verification-with-token")
                .json(&TokenRequest {
                    token: token.to_string(),
                }),
        )
        .await
    }

    /// Confirm an email address with the token from the verification link.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        self.ack(
            self.http
                .get("/users/verify-email")
                .query(&[("token", token)]),
        )
        .await
    }

    /// Request a password-reset email.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.ack(self.http.post("/users/forgot-password").json(&EmailRequest {
            email: email.to_string(),
        }))
        .await
    }

    /// Set a new password using a reset token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        self.ack(
            self.http
                .post("/users/reset-password")
                .query(&[("token", token)])
                .json(&ResetPasswordRequest {
                    new_password: new_password.to_string(),
                }),
        )
        .await
    }

    /// Email the username associated with an address.
    pub async fn forgot_username(&self, email: &str) -> Result<()> {
        self.ack(self.http.post("/users/forgot-username").json(&EmailRequest {
            email: email.to_string(),
        }))
        .await
    }

    /// Send a request whose success payload is a plain-text acknowledgement.
    async fn ack(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Account request failed: {} - {}", status, body);
        Err(classify_response(status, body))
    }
}
