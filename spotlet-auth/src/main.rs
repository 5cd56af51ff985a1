//! spotlet-auth - sign in to the music service and manage the stored credential
//!
//! Typical flow:
//! 1. `spotlet-auth sign-in-url` and open the printed URL in a browser
//! 2. `spotlet-auth exchange '<redirect URL or code>'`
//! 3. `spotlet-auth token` whenever a bearer token is needed

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spotlet_auth::authorize::code_from_redirect;
use spotlet_auth::{CredentialManager, RefreshOutcome, ReqwestTransport};
use spotlet_common::config::TomlConfig;
use spotlet_common::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spotlet-auth", version, about = "Manage the spotlet OAuth2 credential")]
struct Cli {
    /// Config file (overrides SPOTLET_CONFIG and the platform default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the provider authorization URL
    SignInUrl,
    /// Exchange an authorization code (or the full redirect URL) for tokens
    Exchange { code_or_redirect: String },
    /// Show whether a credential is stored and when it expires
    Status,
    /// Print a valid access token, refreshing it first if needed
    Token {
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Refresh the access token if it is close to expiry
    Refresh,
    /// Remove the stored credential
    SignOut,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TomlConfig::load(cli.config.as_deref());

    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting spotlet-auth v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = config.context("Failed to load configuration")?;
    let credentials_path = config.credentials_path();
    info!("Credential file: {}", credentials_path.display());

    let store = Arc::new(FileStore::open(&credentials_path)?);
    let transport = Arc::new(ReqwestTransport::new(config.auth.request_timeout())?);
    let manager = CredentialManager::new(config.auth, store, transport);

    match cli.command {
        Command::SignInUrl => {
            println!("{}", manager.sign_in_url()?);
        }
        Command::Exchange { code_or_redirect } => {
            let code = code_from_redirect(&code_or_redirect).unwrap_or(code_or_redirect);
            manager
                .exchange_code(&code)
                .await
                .context("Authorization code exchange failed")?;
            println!("Signed in");
        }
        Command::Status => match manager.credential()? {
            Some(credential) => {
                println!("Signed in");
                match credential.expires_at {
                    Some(expires_at) => println!("Expires at: {}", expires_at.to_rfc3339()),
                    None => println!("Expires at: unknown"),
                }
                println!("Refresh token stored: {}", credential.refresh_token.is_some());
                println!("Needs refresh: {}", manager.needs_refresh()?);
            }
            None => println!("Signed out"),
        },
        Command::Token { timeout_secs } => {
            let token = manager
                .valid_token(Duration::from_secs(timeout_secs))
                .await
                .context("Could not obtain a valid access token")?;
            println!("{}", token);
        }
        Command::Refresh => match manager.refresh_if_needed().await? {
            RefreshOutcome::Refreshed => println!("Token refreshed"),
            RefreshOutcome::NotNeeded => println!("Token still valid, no refresh needed"),
            RefreshOutcome::InFlight => println!("Refresh already in progress"),
            RefreshOutcome::NoRefreshToken => bail!("Token is stale and no refresh token is stored"),
        },
        Command::SignOut => {
            manager.sign_out()?;
            println!("Signed out");
        }
    }

    Ok(())
}
