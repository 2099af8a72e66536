use anyhow::Result;
use dialoguer::{Confirm, Input, Password};
use std::sync::Arc;

mod account;
mod config;
mod error;
mod gateway;
mod http_client;
mod identity;
mod reconcile;
mod session;

use account::AccountClient;
use config::{Command, Config};
use error::AuthError;
use gateway::AuthGateway;
use http_client::AuthenticatedClient;
use identity::{AssertionSource, IdentityAssertion};
use reconcile::{ReconcileFlow, ReconcileOutcome, ReconcileState};
use session::{SessionOracle, TokenStore};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using account API at {}", config.api_url);

    let store = Arc::new(TokenStore::open(&config.token_db_file)?);
    let oracle = SessionOracle::new(store.clone());
    let gateway = AuthGateway::new(
        &config.api_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;
    let account = AccountClient::new(AuthenticatedClient::new(
        store.clone(),
        &config.api_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);

    match command {
        Command::Login { username } => {
            let password = Password::new()
                .with_prompt(format!("Password for {}", username))
                .interact()?;

            match gateway.login(&username, &password).await {
                Ok(token) => {
                    store.save(&token)?;
                    println!("✅ Logged in as {}", username);
                }
                Err(AuthError::NotVerified(username)) => {
                    println!("Your account is not verified. Please check your email.");
                    let resend = Confirm::new()
                        .with_prompt("Resend the verification email?")
                        .default(true)
                        .interact()?;
                    if resend {
                        match account.resend_verification(&username).await {
                            Ok(()) => println!("Verification link resent."),
                            Err(e) => println!("❌ Failed to resend the link: {}", e),
                        }
                    }
                }
                Err(e) => println!("❌ {}", e),
            }
        }

        Command::Register { username, email } => {
            let password = Password::new()
                .with_prompt("Choose a password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?;

            match gateway.register(&username, &email, &password).await {
                Ok(ack) => println!("✅ {}", ack),
                Err(e) => println!("❌ {}", e),
            }
        }

        Command::Google => {
            let mut source = PastedAssertions;
            run_google_flow(&gateway, &store, &mut source).await?;
        }

        Command::Refresh => match gateway.refresh_token().await {
            Ok(token) => {
                store.save(&token)?;
                println!("✅ Session refreshed");
            }
            Err(e) => println!("❌ {}", e),
        },

        Command::Status => {
            if oracle.is_authenticated() {
                let subject = oracle.current_subject().unwrap_or_else(|| "?".to_string());
                println!("Signed in as {}", subject);
                if let Some(expiry) = oracle.session_expires_at() {
                    println!("Session expires at {}", expiry.to_rfc3339());
                }
            } else {
                println!("Not signed in");
            }
        }

        Command::Logout => {
            gateway.logout(&store).await?;
            println!("Signed out");
        }

        Command::Whoami => match account.profile().await {
            Ok(profile) => {
                println!("Username: {}", profile.username);
                println!("Enabled:  {}", profile.enabled);
            }
            Err(e) => println!("❌ {}", e),
        },

        Command::VerifyEmail { token } => match account.verify_email(&token).await {
            Ok(()) => println!("✅ Your email has been verified"),
            Err(e) => {
                println!("❌ Verification failed: {}", e);
                let resend = Confirm::new()
                    .with_prompt("Request a new verification link?")
                    .default(true)
                    .interact()?;
                if resend {
                    match account.resend_verification_with_token(&token).await {
                        Ok(()) => println!("A new verification link has been sent to your email."),
                        Err(e) => println!("❌ Failed to resend the link: {}", e),
                    }
                }
            }
        },

        Command::ResendVerification { username } => {
            match account.resend_verification(&username).await {
                Ok(()) => println!("Verification link resent."),
                Err(e) => println!("❌ {}", e),
            }
        }

        Command::ForgotPassword { email } => match account.forgot_password(&email).await {
            Ok(()) => println!("If the address is known, a reset email is on its way."),
            Err(e) => println!("❌ {}", e),
        },

        Command::ResetPassword { token } => {
            let new_password = Password::new()
                .with_prompt("New password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?;

            match account.reset_password(&token, &new_password).await {
                Ok(()) => println!("✅ Password updated"),
                Err(e) => println!("❌ {}", e),
            }
        }

        Command::ForgotUsername { email } => match account.forgot_username(&email).await {
            Ok(()) => println!("If the address is known, your username is on its way."),
            Err(e) => println!("❌ {}", e),
        },
    }

    Ok(())
}

/// Assertion source backed by pasting the provider's ID token into the
/// terminal. Stands in for the browser widget callback.
struct PastedAssertions;

impl AssertionSource for PastedAssertions {
    async fn next_assertion(&mut self) -> Option<IdentityAssertion> {
        let raw: String = Input::new()
            .with_prompt("Paste the Google ID token (empty to cancel)")
            .allow_empty(true)
            .interact_text()
            .ok()?;

        if raw.trim().is_empty() {
            None
        } else {
            Some(IdentityAssertion::new(raw.trim()))
        }
    }
}

/// Drive the Google sign-in reconciliation flow with terminal prompts.
async fn run_google_flow(
    gateway: &AuthGateway,
    store: &TokenStore,
    source: &mut impl AssertionSource,
) -> Result<()> {
    let mut flow = ReconcileFlow::new(gateway, store);

    while let Some(assertion) = source.next_assertion().await {
        flow.assertion_received(assertion).await?;

        loop {
            match flow.state() {
                ReconcileState::CollectingUsername {
                    email,
                    username_rejected,
                    ..
                } => {
                    if *username_rejected {
                        println!("That username was not accepted. Try another one.");
                    }
                    let username: String = Input::new()
                        .with_prompt(format!("Choose a username for {}", email))
                        .interact_text()?;
                    flow.submit_username(&username).await?;
                }

                ReconcileState::ResolvingLink {
                    existing_username, ..
                } => {
                    println!(
                        "An account '{}' already uses this email address.",
                        existing_username
                    );
                    let link = Confirm::new()
                        .with_prompt("Link your Google identity to it?")
                        .default(false)
                        .interact()?;

                    if link {
                        let password = Password::new()
                            .with_prompt(format!("Password for {}", existing_username))
                            .interact()?;
                        flow.confirm_link(&password).await?;
                    } else {
                        flow.dismiss_link();
                        break;
                    }
                }

                ReconcileState::Resolved(ReconcileOutcome::LoggedIn) => {
                    println!("✅ Signed in with Google");
                    return Ok(());
                }

                ReconcileState::Resolved(ReconcileOutcome::Failed) => {
                    println!("❌ Google sign-in failed");
                    return Ok(());
                }

                // Link prompt dismissed; wait for the next assertion
                ReconcileState::AwaitingAssertion => break,
            }
        }
    }

    println!("Google sign-in cancelled");
    Ok(())
}
