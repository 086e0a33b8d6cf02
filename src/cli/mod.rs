//! CLI entry point for Belay.

pub mod request;
pub mod tokens;

use clap::{Parser, Subcommand};

/// Belay API client CLI
#[derive(Parser, Debug)]
#[command(name = "belay", version, about = "Belay: resilient API client CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Token store management
    Tokens(TokensArgs),
    /// Send one request through the client pipeline
    Request(RequestArgs),
}

/// Arguments for the `tokens` subcommand group.
#[derive(Parser, Debug)]
pub struct TokensArgs {
    #[command(subcommand)]
    pub command: TokensCommands,
}

#[derive(Subcommand, Debug)]
pub enum TokensCommands {
    /// Store an access/refresh token pair
    Set(SetTokensArgs),
    /// Show which tokens are stored
    Status,
    /// Remove stored tokens
    Clear,
}

/// Arguments for `belay tokens set`.
#[derive(Parser, Debug)]
pub struct SetTokensArgs {
    #[arg(long)]
    pub access: String,

    #[arg(long)]
    pub refresh: String,

    #[arg(long, default_value_t = crate::auth::ACCESS_TOKEN_TTL_DAYS)]
    pub access_ttl_days: u32,

    #[arg(long, default_value_t = crate::auth::REFRESH_TOKEN_TTL_DAYS)]
    pub refresh_ttl_days: u32,
}

/// Arguments for `belay request`.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to BELAY_BASE_URL
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}
