//! Belay: a resilient API client
//!
//! Wraps every outbound call to a REST backend in one pipeline: the stored
//! access token is attached as a bearer header, a 401 triggers a single
//! refresh-and-replay, and transient failures are retried with exponential
//! backoff. Tokens live in a [`auth::TokenStore`]; the bundled
//! [`auth::DualTokenStore`] writes to a primary and a fallback backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use belay::prelude::*;
//!
//! # async fn example() -> belay::error::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let client = Client::new(config, default_token_store())?;
//! let profile: serde_json::Value = client.send_api(client.get("/users/me")).await?;
//! println!("{profile}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
