// Google sign-in reconciliation
// Maps one identity assertion to a direct login, a new-account registration,
// or an account link, as an explicit state machine

use crate::error::{AuthError, Result};
use crate::gateway::{AuthGateway, GoogleLogin};
use crate::identity::IdentityAssertion;
use crate::session::TokenStore;

/// Terminal result of one reconciliation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Token persisted; the caller can proceed to the authenticated area
    LoggedIn,

    /// Generic failure; the caller decides the messaging, there is no retry
    Failed,
}

/// State of the reconciliation flow.
///
/// The assertion lives inside the states that still need it, so an assertion
/// can neither outlive its flow nor exist in a state that has no use for it.
#[derive(Debug)]
pub enum ReconcileState {
    /// Waiting for the identity provider to deliver an assertion
    AwaitingAssertion,

    /// No local account is linked to the asserted identity; a username must
    /// be collected before registering
    CollectingUsername {
        assertion: IdentityAssertion,
        google_id: String,
        email: String,
        /// Set when a submitted username was rejected, so the prompt can
        /// re-ask without losing the held assertion
        username_rejected: bool,
    },

    /// The asserted email collides with an unlinked local account; the user
    /// must confirm (with their password) or dismiss the link
    ResolvingLink {
        assertion: IdentityAssertion,
        existing_username: String,
    },

    /// Flow finished
    Resolved(ReconcileOutcome),
}

/// Drives one Google sign-in attempt against the gateway and token store.
///
/// `&mut self` transitions guarantee a single network exchange in flight at
/// a time; an assertion delivered while a prompt is active is dropped.
pub struct ReconcileFlow<'a> {
    gateway: &'a AuthGateway,
    store: &'a TokenStore,
    state: ReconcileState,
}

impl<'a> ReconcileFlow<'a> {
    pub fn new(gateway: &'a AuthGateway, store: &'a TokenStore) -> Self {
        Self {
            gateway,
            store,
            state: ReconcileState::AwaitingAssertion,
        }
    }

    pub fn state(&self) -> &ReconcileState {
        &self.state
    }

    /// Feed one assertion from the identity provider.
    ///
    /// Exchanges it with the account API and transitions to `Resolved`,
    /// `CollectingUsername` or `ResolvingLink` accordingly.
    pub async fn assertion_received(
        &mut self,
        assertion: IdentityAssertion,
    ) -> Result<&ReconcileState> {
        if !matches!(self.state, ReconcileState::AwaitingAssertion) {
            tracing::warn!("Dropping identity assertion delivered while a prompt is active");
            return Ok(&self.state);
        }

        self.state = match self.gateway.login_with_google(&assertion).await {
            Ok(GoogleLogin::LoggedIn { access_token }) => {
                self.store.save(&access_token)?;
                ReconcileState::Resolved(ReconcileOutcome::LoggedIn)
            }
            Ok(GoogleLogin::Unlinked { google_id, email }) => ReconcileState::CollectingUsername {
                assertion,
                google_id,
                email,
                username_rejected: false,
            },
            Err(AuthError::AlreadyExists) => {
                match self.gateway.existing_google_user(&assertion).await {
                    Ok(existing_username) => ReconcileState::ResolvingLink {
                        assertion,
                        existing_username,
                    },
                    Err(e) => {
                        tracing::warn!("Existing-user lookup failed: {}", e);
                        ReconcileState::Resolved(ReconcileOutcome::Failed)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Google sign-in failed: {}", e);
                ReconcileState::Resolved(ReconcileOutcome::Failed)
            }
        };

        Ok(&self.state)
    }

    /// Submit the username chosen for a new Google-bound account.
    ///
    /// On rejection (e.g. the username is taken) the flow stays in
    /// `CollectingUsername` with `username_rejected` set, keeping the held
    /// assertion so the prompt can simply re-ask.
    pub async fn submit_username(&mut self, username: &str) -> Result<&ReconcileState> {
        match std::mem::replace(&mut self.state, ReconcileState::AwaitingAssertion) {
            ReconcileState::CollectingUsername {
                assertion,
                google_id,
                email,
                ..
            } => {
                match self
                    .gateway
                    .register_with_google(&assertion, username)
                    .await
                {
                    Ok(access_token) => {
                        self.store.save(&access_token)?;
                        self.state = ReconcileState::Resolved(ReconcileOutcome::LoggedIn);
                    }
                    Err(e) => {
                        tracing::warn!("Username '{}' was not accepted: {}", username, e);
                        self.state = ReconcileState::CollectingUsername {
                            assertion,
                            google_id,
                            email,
                            username_rejected: true,
                        };
                    }
                }
            }
            other => {
                tracing::warn!("submit_username called outside CollectingUsername");
                self.state = other;
            }
        }

        Ok(&self.state)
    }

    /// Confirm linking the asserted identity to the colliding local account.
    ///
    /// A wrong password keeps the flow in `ResolvingLink` for a re-prompt;
    /// any other failure resolves the flow.
    pub async fn confirm_link(&mut self, password: &str) -> Result<&ReconcileState> {
        match std::mem::replace(&mut self.state, ReconcileState::AwaitingAssertion) {
            ReconcileState::ResolvingLink {
                assertion,
                existing_username,
            } => match self.gateway.link_google_account(&assertion, password).await {
                Ok(access_token) => {
                    self.store.save(&access_token)?;
                    self.state = ReconcileState::Resolved(ReconcileOutcome::LoggedIn);
                }
                Err(AuthError::InvalidCredentials) => {
                    self.state = ReconcileState::ResolvingLink {
                        assertion,
                        existing_username,
                    };
                }
                Err(e) => {
                    tracing::warn!("Account linking failed: {}", e);
                    self.state = ReconcileState::Resolved(ReconcileOutcome::Failed);
                }
            },
            other => {
                tracing::warn!("confirm_link called outside ResolvingLink");
                self.state = other;
            }
        }

        Ok(&self.state)
    }

    /// Dismiss the link-confirmation prompt, discarding the held assertion
    /// and returning to `AwaitingAssertion`.
    pub fn dismiss_link(&mut self) -> &ReconcileState {
        match self.state {
            ReconcileState::ResolvingLink { .. } => {
                self.state = ReconcileState::AwaitingAssertion;
            }
            _ => {
                tracing::warn!("dismiss_link called outside ResolvingLink");
            }
        }
        &self.state
    }
}
