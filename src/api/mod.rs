//! wg-easy REST API binding
//!
//! `session` owns the cookie and the re-authentication loop, `transport`
//! talks HTTP, and `client` maps one method to one endpoint.

pub mod client;
pub mod models;
pub mod rules;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiResult, WgEasyClient};
pub use models::{ApiError, Client, Created, Message, Release, SessionStatus};
pub use session::{AuthorizationError, Session, SessionPhase};
pub use transport::{ApiRequest, ApiResponse, ClientOptions, HttpTransport, Transport, TransportError};

use thiserror::Error;

/// Errors building a [`WgEasyClient`]
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("baseURL not specified")]
    MissingBaseUrl,

    #[error("password not specified")]
    MissingPassword,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
