//! Belay CLI binary entry point.

use belay::auth::default_token_store;
use belay::cli::{Cli, Commands, TokensCommands};
use belay::client::Client;
use belay::config::ClientConfig;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let store = default_token_store();

    let result = match cli.command {
        Commands::Tokens(tokens) => {
            match tokens.command {
                TokensCommands::Set(args) => belay::cli::tokens::handle_set(store.as_ref(), &args),
                TokensCommands::Status => belay::cli::tokens::handle_status(store.as_ref()),
                TokensCommands::Clear => belay::cli::tokens::handle_clear(store.as_ref()),
            }
            Ok(())
        }
        Commands::Request(args) => {
            let client = ClientConfig::from_env()
                .map(|config| {
                    config.with_on_auth_error(|| {
                        eprintln!("⚠️  Session expired, stored tokens were cleared. Log in again.")
                    })
                })
                .and_then(|config| Client::new(config, store));
            match client {
                Ok(client) => belay::cli::request::handle_request(&client, &args).await,
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("belay=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
