//! wg-easy client - typed access to the wg-easy WireGuard management API
//!
//! This crate wraps the REST API of a wg-easy server: listing, creating,
//! renaming, enabling, disabling, re-addressing and deleting WireGuard
//! peers, and fetching their configuration and QR code. The web UI
//! password is exchanged for a session cookie on demand; an expired session
//! is renewed and the request replayed without the caller noticing.
//!
//! # Architecture
//!
//! - `api`: The client, its session handling and the HTTP transport
//! - `config`: Configuration file handling (TOML) for the CLI
//!
//! # Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = wg_easy_client::WgEasyClient::new("http://127.0.0.1:51821", "password")?;
//! for peer in client.get_clients().await?? {
//!     println!("{} {}", peer.name, peer.address);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;

pub use api::{ApiError, ApiResult, AuthorizationError, BuildError, Client, WgEasyClient};
pub use config::Config;
