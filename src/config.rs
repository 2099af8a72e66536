use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use std::io::Write;
use std::path::PathBuf;

/// Login Client - command-line client for the account API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the account API (e.g. https://example.com/api/v1)
    #[arg(long, env = "ACCOUNT_API_URL")]
    pub api_url: Option<String>,

    /// Path to the local token database
    #[arg(long, env = "TOKEN_DB_FILE")]
    pub token_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with username and password
    Login {
        username: String,
    },
    /// Create a new account
    Register {
        username: String,
        email: String,
    },
    /// Sign in with a Google identity token
    Google,
    /// Obtain a fresh access token
    Refresh,
    /// Show session status
    Status,
    /// End the session
    Logout,
    /// Show the signed-in account profile
    Whoami,
    /// Confirm an email address with a verification token
    VerifyEmail {
        token: String,
    },
    /// Resend the verification email
    ResendVerification {
        username: String,
    },
    /// Request a password-reset email
    ForgotPassword {
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        token: String,
    },
    /// Recover a forgotten username
    ForgotUsername {
        email: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the account API
    pub api_url: String,

    /// Local token database
    pub token_db_file: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > first-run setup/defaults.
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        let api_url = match args.api_url {
            Some(url) => url,
            None => run_first_time_setup()?,
        };

        let token_db_file = args
            .token_db
            .map(|s| expand_tilde(&s))
            .unwrap_or_else(default_token_db);

        let config = Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            token_db_file,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.request_timeout,
            log_level: args.log_level,
        };

        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("ACCOUNT_API_URL must be an http(s) URL: {}", self.api_url);
        }

        Ok(())
    }
}

/// Default token database location under the platform data directory
fn default_token_db() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("login-client")
        .join("session.db")
}

/// Expand tilde (~) in file paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Prompt for the API URL on first run and optionally persist it to .env.
fn run_first_time_setup() -> Result<String> {
    println!();
    println!("No account API configured yet.");
    println!();

    let api_url: String = Input::new()
        .with_prompt("Base URL of the account API (ACCOUNT_API_URL)")
        .validate_with(|input: &String| {
            if input.starts_with("http://") || input.starts_with("https://") {
                Ok(())
            } else {
                Err("must be an http(s) URL")
            }
        })
        .interact_text()
        .context("Failed to read ACCOUNT_API_URL")?;

    let save_to_env = Confirm::new()
        .with_prompt("Save to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&api_url)?;
        println!("Configuration saved to .env");
    }

    Ok(api_url)
}

/// Save configuration to .env file
fn save_env_file(api_url: &str) -> Result<()> {
    let env_content = format!(
        r#"# Login Client configuration

# Base URL of the account API (required)
ACCOUNT_API_URL={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=warn
"#,
        api_url,
    );

    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_content.as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
