// Error handling module
// Classifies account API failures into the taxonomy callers act on

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the auth gateway and session layer.
///
/// Classification happens exactly once, at the gateway; callers decide the
/// user-facing messaging. Anything not specifically classified falls through
/// as a generic server or network error.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong username/password, or a login rejected for an unspecified reason
    #[error("Invalid credentials or login failed")]
    InvalidCredentials,

    /// The account exists but its email address has not been verified.
    /// Carries the attempted username so the caller can offer to resend
    /// the verification email.
    #[error("User '{0}' is not verified")]
    NotVerified(String),

    /// The asserted identity's email collides with a local account that is
    /// not yet linked to it
    #[error("A local account already exists for this identity")]
    AlreadyExists,

    /// The server rejected the request payload
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The stored access token could not be decoded
    #[error("Malformed access token")]
    #[allow(dead_code)]
    MalformedToken,

    /// Error response from the account API
    #[error("Account API error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Fallback classification for an error response.
///
/// Operation-specific conditions (not-verified, already-exists) are matched
/// by the individual gateway calls before reaching this.
pub(crate) fn classify_response(status: StatusCode, body: String) -> AuthError {
    match status {
        StatusCode::BAD_REQUEST => AuthError::ValidationFailed(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::InvalidCredentials,
        _ => AuthError::Server {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "Invalid credentials or login failed");

        let err = AuthError::NotVerified("bob".to_string());
        assert_eq!(err.to_string(), "User 'bob' is not verified");

        let err = AuthError::Server {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Account API error: 503 - Service unavailable"
        );
    }

    #[test]
    fn test_validation_error_message() {
        let err = AuthError::ValidationFailed("Username is mandatory".to_string());
        assert_eq!(err.to_string(), "Validation failed: Username is mandatory");
    }

    #[test]
    fn test_internal_error_message() {
        let err = AuthError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_classify_bad_request() {
        let err = classify_response(StatusCode::BAD_REQUEST, "Username is mandatory".to_string());
        assert!(matches!(err, AuthError::ValidationFailed(msg) if msg == "Username is mandatory"));
    }

    #[test]
    fn test_classify_auth_failures() {
        assert!(matches!(
            classify_response(StatusCode::UNAUTHORIZED, String::new()),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            classify_response(StatusCode::FORBIDDEN, String::new()),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_classify_server_errors() {
        let err = classify_response(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        assert!(matches!(err, AuthError::Server { status: 500, .. }));

        let err = classify_response(StatusCode::CONFLICT, "User already exists".to_string());
        assert!(matches!(err, AuthError::Server { status: 409, .. }));
    }
}
