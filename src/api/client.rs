//! Typed wg-easy API client
//!
//! Every method resolves to an [`ApiResult`]:
//!
//! - `Err(AuthorizationError)` when the client cannot authenticate at all
//!   (wrong password, login endpoint unreachable, retries exhausted)
//! - `Ok(Err(ApiError))` when this one call failed
//! - `Ok(Ok(value))` on success
//!
//! Name and address uniqueness is checked against a fresh client list
//! before each write. The check and the write are separate requests, so two
//! writers racing each other can still collide.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::BuildError;
use super::models::{ApiError, Client, Created, Message, Release, SessionStatus};
use super::rules::{find_client, forbidden_name_reason};
use super::session::{AuthorizationError, SESSION_PATH, SendError, Session, SessionPhase};
use super::transport::{ApiRequest, ApiResponse, ClientOptions, HttpTransport, Transport};

const RELEASE_PATH: &str = "/api/release";
const CLIENTS_PATH: &str = "/api/wireguard/client/";

/// Outer error: fatal authentication failure. Inner error: per-call failure.
pub type ApiResult<T> = Result<Result<T, ApiError>, AuthorizationError>;

pub struct WgEasyClient {
    session: Session,
}

impl WgEasyClient {
    /// Create a client with default options
    ///
    /// # Arguments
    /// * `base_url` - Server root, e.g. `https://vpn.example.com` or
    ///   `http://127.0.0.1:51821`
    /// * `password` - Password of the wg-easy web UI
    ///
    /// No request is sent until the first call.
    pub fn new(base_url: &str, password: &str) -> Result<Self, BuildError> {
        Self::with_options(base_url, password, &ClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        password: &str,
        options: &ClientOptions,
    ) -> Result<Self, BuildError> {
        if base_url.trim().is_empty() {
            return Err(BuildError::MissingBaseUrl);
        }
        if password.is_empty() {
            return Err(BuildError::MissingPassword);
        }

        let transport = HttpTransport::new(base_url, options)?;
        Self::with_transport(Arc::new(transport), password)
    }

    /// Create a client over any [`Transport`]
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        password: &str,
    ) -> Result<Self, BuildError> {
        if password.is_empty() {
            return Err(BuildError::MissingPassword);
        }

        Ok(Self {
            session: Session::new(transport, password),
        })
    }

    /// Log in now rather than on the first 401
    pub async fn login(&self) -> Result<(), AuthorizationError> {
        self.session.login().await
    }

    pub async fn session_phase(&self) -> SessionPhase {
        self.session.phase().await
    }

    pub async fn get_release(&self) -> ApiResult<Release> {
        self.fetch_payload(ApiRequest::get(RELEASE_PATH)).await
    }

    pub async fn get_session(&self) -> ApiResult<SessionStatus> {
        self.fetch_json(ApiRequest::get(SESSION_PATH)).await
    }

    pub async fn get_clients(&self) -> ApiResult<Vec<Client>> {
        self.fetch_json(ApiRequest::get(CLIENTS_PATH)).await
    }

    /// WireGuard configuration file for a client
    pub async fn get_config(&self, client_id: &str) -> ApiResult<String> {
        self.fetch_text(ApiRequest::get(client_path(client_id, "/configuration")))
            .await
    }

    /// QR code of the client configuration, as SVG
    pub async fn get_qr_code(&self, client_id: &str) -> ApiResult<String> {
        self.fetch_text(ApiRequest::get(client_path(client_id, "/qrcode.svg")))
            .await
    }

    pub async fn enable(&self, client_id: &str) -> ApiResult<Message> {
        info!("Enabling client {}", client_id);
        let request = ApiRequest::post(client_path(client_id, "/enable"), None);
        self.fetch_message(request, "Enabled").await
    }

    pub async fn disable(&self, client_id: &str) -> ApiResult<Message> {
        info!("Disabling client {}", client_id);
        let request = ApiRequest::post(client_path(client_id, "/disable"), None);
        self.fetch_message(request, "Disabled").await
    }

    /// Rename a client.
    ///
    /// Names that look like an IP or an id are refused without contacting
    /// the server, and so is a name another client already has.
    pub async fn rename(&self, client_id: &str, new_name: &str) -> ApiResult<Message> {
        if let Some(reason) = forbidden_name_reason(new_name) {
            return Ok(Err(ApiError::new(reason)));
        }

        if self.find(new_name).await?.is_ok() {
            return Ok(Err(ApiError::new(format!(
                "The name {new_name} is already taken"
            ))));
        }

        info!("Renaming client {} to {}", client_id, new_name);
        let request = ApiRequest::put(client_path(client_id, "/name"), json!({ "name": new_name }));
        self.fetch_message(request, "Renamed").await
    }

    /// Move a client to `address`, unless another lookup already resolves it
    pub async fn update_address(&self, client_id: &str, address: &str) -> ApiResult<Message> {
        if self.find(address).await?.is_ok() {
            return Ok(Err(ApiError::new(format!(
                "The address {address} is already occupied"
            ))));
        }

        info!("Moving client {} to {}", client_id, address);
        let request = ApiRequest::put(
            client_path(client_id, "/address"),
            json!({ "address": address }),
        );
        self.fetch_message(request, "Address updated").await
    }

    /// Look up a client by id, name or address
    pub async fn find(&self, client: &str) -> ApiResult<Client> {
        let clients = match self.get_clients().await? {
            Ok(clients) => clients,
            Err(err) => return Ok(Err(err)),
        };

        Ok(find_client(clients, client)
            .ok_or_else(|| ApiError::new(format!("Client {client} not found"))))
    }

    /// Create a client named `name`, unless one already exists
    pub async fn create(&self, name: &str) -> ApiResult<Created> {
        if self.find(name).await?.is_ok() {
            return Ok(Err(ApiError::new(format!("Client {name} already exists"))));
        }

        info!("Creating client {}", name);
        self.fetch_payload(ApiRequest::post(CLIENTS_PATH, Some(json!({ "name": name }))))
            .await
    }

    pub async fn delete(&self, client_id: &str) -> ApiResult<Message> {
        info!("Deleting client {}", client_id);
        let request = ApiRequest::delete(format!("{CLIENTS_PATH}{client_id}"));
        self.fetch_message(request, "Deleted").await
    }

    /// Send through the session and sort the outcome into the two channels
    async fn fetch(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        match self.session.send(&request).await {
            Ok(response) if response.status.is_success() => Ok(Ok(response)),
            Ok(response) => {
                debug!(
                    "{} {} failed with {}",
                    request.method, request.path, response.status
                );
                Ok(Err(ApiError::from_body(&response.body)))
            }
            Err(SendError::Authorization(err)) => Err(err),
            Err(SendError::Transport(err)) => {
                warn!("{} {} failed: {}", request.method, request.path, err);
                Ok(Err(ApiError::unknown()))
            }
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        Ok(self.fetch(request).await?.and_then(|response| {
            serde_json::from_str(&response.body)
                .map_err(|e| ApiError::new(format!("Invalid response body: {e}")))
        }))
    }

    /// Untyped body of a 2xx response. The write already happened, so a body
    /// that is not JSON is handed back as a string rather than failing.
    async fn fetch_payload(&self, request: ApiRequest) -> ApiResult<serde_json::Value> {
        Ok(self
            .fetch(request)
            .await?
            .map(|response| lenient_json(&response.body)))
    }

    async fn fetch_text(&self, request: ApiRequest) -> ApiResult<String> {
        Ok(self.fetch(request).await?.map(|response| response.body))
    }

    async fn fetch_message(&self, request: ApiRequest, message: &str) -> ApiResult<Message> {
        Ok(self.fetch(request).await?.map(|_| Message::new(message)))
    }
}

fn lenient_json(body: &str) -> serde_json::Value {
    if body.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

fn client_path(client_id: &str, suffix: &str) -> String {
    format!("{CLIENTS_PATH}{client_id}{suffix}")
}
