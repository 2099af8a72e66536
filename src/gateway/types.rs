// Account API wire types

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login/refresh/link response
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

/// Google exchange response.
///
/// Carries either an access token (identity already linked to a local
/// account) or the provider id and email needed to create one - never both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleExchangeResponse {
    pub access_token: Option<String>,
    pub google_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct GoogleRegisterRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct GoogleLinkRequest {
    pub password: String,
}

/// Username of the local account colliding with an asserted identity
#[derive(Deserialize)]
pub struct ExistingUserResponse {
    pub username: String,
}
