// Integration tests for Login Client
//
// These tests drive the full client stack - gateway, token store, session
// oracle and the reconciliation flow - against a mocked account API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use std::sync::Arc;

use login_client::{
    error::AuthError,
    gateway::AuthGateway,
    http_client::AuthenticatedClient,
    identity::{AssertionSource, IdentityAssertion, QueuedAssertions},
    reconcile::{ReconcileFlow, ReconcileOutcome, ReconcileState},
    session::{SessionOracle, TokenStore},
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

/// Build an unsigned JWT whose exp lies the given seconds away from now
fn jwt(sub: &str, exp_offset_secs: i64) -> String {
    let exp = Utc::now().timestamp() + exp_offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}","exp":{}}}"#, sub, exp));
    format!("{}.{}.sig", header, payload)
}

fn gateway(server: &mockito::ServerGuard) -> AuthGateway {
    AuthGateway::new(server.url(), 5, 10).expect("Failed to create gateway")
}

fn memory_store() -> Arc<TokenStore> {
    Arc::new(TokenStore::open_in_memory().expect("Failed to open in-memory store"))
}

// ==================================================================================================
// Session Oracle Properties
// ==================================================================================================

#[test]
fn test_expired_token_is_never_authenticated() {
    let store = memory_store();
    store.save(&jwt("alice", -3600)).unwrap();

    let oracle = SessionOracle::new(store);
    assert!(!oracle.is_authenticated());
}

#[test]
fn test_fresh_token_is_authenticated_immediately_after_save() {
    let store = memory_store();
    store.save(&jwt("alice", 3600)).unwrap();

    let oracle = SessionOracle::new(store);
    assert!(oracle.is_authenticated());
}

#[test]
fn test_token_survives_reopen() {
    let path = std::env::temp_dir().join(format!(
        "login-client-test-{}-reopen.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let store = TokenStore::open(&path).unwrap();
        store.save(&jwt("alice", 3600)).unwrap();
    }

    // A fresh handle over the same file still sees the session
    let store = Arc::new(TokenStore::open(&path).unwrap());
    assert!(SessionOracle::new(store).is_authenticated());

    let _ = std::fs::remove_file(&path);
}

// ==================================================================================================
// Login and Logout
// ==================================================================================================

#[tokio::test]
async fn test_credential_login_persists_token() {
    let mut server = mockito::Server::new_async().await;
    let token = jwt("alice", 3600);
    server
        .mock("POST", "/login")
        .with_body(format!(r#"{{"accessToken":"{}"}}"#, token))
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();

    let received = gateway.login("alice", "hunter2").await.unwrap();
    store.save(&received).unwrap();

    let oracle = SessionOracle::new(store);
    assert!(oracle.is_authenticated());
    assert_eq!(oracle.current_subject().as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_unverified_login_carries_username() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/login")
        .with_status(403)
        .with_body("User is not verified")
        .create_async()
        .await;

    let err = gateway(&server).login("bob", "wrong").await.unwrap_err();

    // Distinguishable from a plain credential failure
    assert!(matches!(err, AuthError::NotVerified(u) if u == "bob"));
}

#[tokio::test]
async fn test_logout_clears_locally_when_server_unreachable() {
    // Point at a closed port - the logout call can only fail
    let gateway = AuthGateway::new("http://127.0.0.1:1", 1, 1).unwrap();
    let store = memory_store();
    store.save(&jwt("alice", 3600)).unwrap();

    gateway.logout(&store).await.unwrap();

    assert_eq!(store.read().unwrap(), None);
    assert!(!SessionOracle::new(store).is_authenticated());
}

#[tokio::test]
async fn test_refresh_overwrites_stored_token() {
    let mut server = mockito::Server::new_async().await;
    let fresh = jwt("alice", 7200);
    server
        .mock("POST", "/refresh-token")
        .with_body(format!(r#"{{"accessToken":"{}"}}"#, fresh))
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    store.save(&jwt("alice", 30)).unwrap();

    let token = gateway.refresh_token().await.unwrap();
    store.save(&token).unwrap();

    assert_eq!(store.read().unwrap(), Some(fresh));
}

// ==================================================================================================
// Google Reconciliation Flow
// ==================================================================================================

#[tokio::test]
async fn test_linked_identity_resolves_without_username_prompt() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/google")
        .with_body(r#"{"accessToken":"abc"}"#)
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    let mut flow = ReconcileFlow::new(&gateway, &store);

    let state = flow
        .assertion_received(IdentityAssertion::new("id-token"))
        .await
        .unwrap();

    assert!(matches!(
        state,
        ReconcileState::Resolved(ReconcileOutcome::LoggedIn)
    ));
    assert_eq!(store.read().unwrap(), Some("abc".to_string()));
}

#[tokio::test]
async fn test_unlinked_identity_registers_with_chosen_username() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/google")
        .with_body(r#"{"googleId":"g1","email":"a@b.com"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/google/register")
        .match_body(mockito::Matcher::Json(
            serde_json::json!({"username": "alice"}),
        ))
        .with_body(r#"{"accessToken":"tok-new"}"#)
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    let mut flow = ReconcileFlow::new(&gateway, &store);

    // The identity source delivers exactly one assertion per interaction
    let mut source = QueuedAssertions::new([IdentityAssertion::new("id-token")]);
    let assertion = source.next_assertion().await.unwrap();

    flow.assertion_received(assertion).await.unwrap();
    assert!(matches!(
        flow.state(),
        ReconcileState::CollectingUsername { .. }
    ));

    flow.submit_username("alice").await.unwrap();
    assert!(matches!(
        flow.state(),
        ReconcileState::Resolved(ReconcileOutcome::LoggedIn)
    ));
    assert_eq!(store.read().unwrap(), Some("tok-new".to_string()));
}

#[tokio::test]
async fn test_colliding_email_surfaces_existing_username() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/google")
        .with_status(409)
        .with_body("User already exists")
        .create_async()
        .await;
    server
        .mock("GET", "/auth/google/user")
        .match_header("authorization", "Bearer id-token")
        .with_body(r#"{"username":"old-alice"}"#)
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    let mut flow = ReconcileFlow::new(&gateway, &store);

    flow.assertion_received(IdentityAssertion::new("id-token"))
        .await
        .unwrap();

    match flow.state() {
        ReconcileState::ResolvingLink {
            existing_username, ..
        } => assert_eq!(existing_username, "old-alice"),
        other => panic!("expected ResolvingLink, got {:?}", other),
    }

    // No token was persisted along the way
    assert_eq!(store.read().unwrap(), None);
}

#[tokio::test]
async fn test_link_confirmation_logs_in() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/google")
        .with_status(409)
        .with_body("User already exists")
        .create_async()
        .await;
    server
        .mock("GET", "/auth/google/user")
        .with_body(r#"{"username":"old-alice"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/google/link")
        .match_body(mockito::Matcher::Json(
            serde_json::json!({"password": "hunter2"}),
        ))
        .with_body(r#"{"accessToken":"tok-linked"}"#)
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    let mut flow = ReconcileFlow::new(&gateway, &store);

    flow.assertion_received(IdentityAssertion::new("id-token"))
        .await
        .unwrap();
    flow.confirm_link("hunter2").await.unwrap();

    assert!(matches!(
        flow.state(),
        ReconcileState::Resolved(ReconcileOutcome::LoggedIn)
    ));
    assert_eq!(store.read().unwrap(), Some("tok-linked".to_string()));
}

#[tokio::test]
async fn test_generic_exchange_failure_resolves_failed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/google")
        .with_status(401)
        .with_body("Invalid token")
        .create_async()
        .await;

    let gateway = gateway(&server);
    let store = memory_store();
    let mut flow = ReconcileFlow::new(&gateway, &store);

    flow.assertion_received(IdentityAssertion::new("bad-token"))
        .await
        .unwrap();

    assert!(matches!(
        flow.state(),
        ReconcileState::Resolved(ReconcileOutcome::Failed)
    ));
    assert_eq!(store.read().unwrap(), None);
}

// ==================================================================================================
// Request Authentication
// ==================================================================================================

#[tokio::test]
async fn test_protected_call_carries_stored_bearer() {
    let mut server = mockito::Server::new_async().await;
    let token = jwt("alice", 3600);
    let mock = server
        .mock("GET", "/users")
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_body(r#"{"username":"alice","enabled":true}"#)
        .create_async()
        .await;

    let store = memory_store();
    store.save(&token).unwrap();

    let client = AuthenticatedClient::new(store, server.url(), 5, 10).unwrap();
    let response = client.get("/users").send().await.unwrap();

    assert!(response.status().is_success());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthenticated_call_omits_bearer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .match_header("authorization", mockito::Matcher::Missing)
        .with_status(401)
        .create_async()
        .await;

    let client = AuthenticatedClient::new(memory_store(), server.url(), 5, 10).unwrap();
    let response = client.get("/users").send().await.unwrap();

    // The 401 is the caller's concern; nothing retries or refreshes here
    assert_eq!(response.status().as_u16(), 401);
    mock.assert_async().await;
}
