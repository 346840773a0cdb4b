//! In-memory transport for tests

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::session::SESSION_PATH;
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

pub const PASSWORD: &str = "secret";
pub const SESSION_COOKIE: &str = "connect.sid=s%3Atest";

const CLIENTS_PATH: &str = "/api/wireguard/client/";

type Handler = Box<dyn Fn(&ApiRequest, Option<&str>) -> ApiResponse + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub cookie: Option<String>,
}

struct WgState {
    clients: Vec<Value>,
    session_valid: bool,
    next_host: u8,
}

enum Mode {
    Scripted(Handler),
    WgEasy(Mutex<WgState>),
    Unreachable,
}

pub struct FakeServer {
    mode: Mode,
    log: Mutex<Vec<Recorded>>,
    yield_first: AtomicBool,
}

impl FakeServer {
    /// Answer every request with `handler`
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, Option<&str>) -> ApiResponse + Send + Sync + 'static,
    {
        Self::with_mode(Mode::Scripted(Box::new(handler)))
    }

    /// Behave like a password-protected wg-easy holding `clients`
    pub fn wg_easy(clients: Vec<Value>) -> Arc<Self> {
        let next_host = 2 + clients.len() as u8;
        Self::with_mode(Mode::WgEasy(Mutex::new(WgState {
            clients,
            session_valid: false,
            next_host,
        })))
    }

    /// Fail every request before a response arrives
    pub fn unreachable() -> Arc<Self> {
        Self::with_mode(Mode::Unreachable)
    }

    fn with_mode(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            log: Mutex::new(Vec::new()),
            yield_first: AtomicBool::new(false),
        })
    }

    /// Yield to the scheduler before answering, so concurrent requests
    /// interleave
    pub fn yielding(self: Arc<Self>) -> Arc<Self> {
        self.yield_first.store(true, Ordering::SeqCst);
        self
    }

    /// Invalidate the current session cookie server-side
    pub fn expire_sessions(&self) {
        if let Mode::WgEasy(state) = &self.mode {
            state.lock().unwrap().session_valid = false;
        }
    }

    pub fn clients(&self) -> Vec<Value> {
        match &self.mode {
            Mode::WgEasy(state) => state.lock().unwrap().clients.clone(),
            _ => Vec::new(),
        }
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn login_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|r| r.method == Method::POST && r.path == SESSION_PATH)
            .count()
    }

    pub fn count_path(&self, path: &str) -> usize {
        self.log().iter().filter(|r| r.path == path).count()
    }

    /// Requests other than logins and session checks
    pub fn api_calls(&self) -> Vec<Recorded> {
        self.log()
            .into_iter()
            .filter(|r| r.path != SESSION_PATH)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(
        &self,
        request: &ApiRequest,
        cookie: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        if self.yield_first.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        self.log.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            body: request.body.clone(),
            cookie: cookie.map(str::to_string),
        });

        match &self.mode {
            Mode::Scripted(handler) => Ok(handler(request, cookie)),
            Mode::WgEasy(state) => Ok(route(&mut state.lock().unwrap(), request, cookie)),
            Mode::Unreachable => Err(TransportError::Connection("connection refused".to_string())),
        }
    }
}

pub fn client_json(id: &str, name: &str, address: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "enabled": true,
        "address": address,
        "publicKey": format!("{name}-public-key="),
        "createdAt": "2024-05-01T10:00:00.000Z",
        "updatedAt": "2024-05-01T10:00:00.000Z",
        "persistentKeepalive": "off",
        "latestHandshakeAt": null,
        "transferRx": 0,
        "transferTx": 0
    })
}

fn error(status: StatusCode, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "error": message }).to_string())
}

fn route(state: &mut WgState, request: &ApiRequest, cookie: Option<&str>) -> ApiResponse {
    let authenticated = state.session_valid && cookie == Some(SESSION_COOKIE);

    if request.path == SESSION_PATH {
        if request.method == Method::GET {
            let body = json!({ "requiresPassword": true, "authenticated": authenticated });
            return ApiResponse::new(StatusCode::OK, body.to_string());
        }
        let password = request.body.as_ref().and_then(|b| b["password"].as_str());
        if password != Some(PASSWORD) {
            return error(StatusCode::UNAUTHORIZED, "Incorrect Password");
        }
        state.session_valid = true;
        return ApiResponse::new(StatusCode::NO_CONTENT, "")
            .with_cookie(format!("{SESSION_COOKIE}; Path=/; HttpOnly"));
    }

    if !authenticated {
        return error(StatusCode::UNAUTHORIZED, "Not Logged In");
    }

    if request.path == "/api/release" {
        return ApiResponse::new(StatusCode::OK, "14");
    }

    if request.path == CLIENTS_PATH {
        if request.method == Method::GET {
            return ApiResponse::new(StatusCode::OK, Value::from(state.clients.clone()).to_string());
        }
        let Some(name) = request.body.as_ref().and_then(|b| b["name"].as_str()) else {
            return error(StatusCode::BAD_REQUEST, "Missing: Name");
        };
        let host = state.next_host;
        state.next_host += 1;
        let created = client_json(
            &format!("c{host}-0000-1111-2222-333333333333"),
            name,
            &format!("10.0.0.{host}"),
        );
        state.clients.push(created.clone());
        return ApiResponse::new(StatusCode::OK, created.to_string());
    }

    let Some(rest) = request.path.strip_prefix(CLIENTS_PATH) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    let (id, action) = rest.split_once('/').unwrap_or((rest, ""));
    let Some(index) = state.clients.iter().position(|c| c["id"] == id) else {
        return error(StatusCode::NOT_FOUND, &format!("Client Not Found: {id}"));
    };

    match (request.method.as_str(), action) {
        ("GET", "configuration") => {
            let address = state.clients[index]["address"].as_str().unwrap_or_default();
            ApiResponse::new(
                StatusCode::OK,
                format!("[Interface]\nPrivateKey = test\nAddress = {address}/24\n"),
            )
        }
        ("GET", "qrcode.svg") => ApiResponse::new(StatusCode::OK, "<svg></svg>"),
        ("POST", "enable") => {
            state.clients[index]["enabled"] = json!(true);
            ApiResponse::new(StatusCode::NO_CONTENT, "")
        }
        ("POST", "disable") => {
            state.clients[index]["enabled"] = json!(false);
            ApiResponse::new(StatusCode::NO_CONTENT, "")
        }
        ("PUT", "name") | ("PUT", "address") => {
            let value = request.body.as_ref().and_then(|b| b[action].as_str());
            let Some(value) = value else {
                return error(StatusCode::BAD_REQUEST, "Missing value");
            };
            state.clients[index][action] = json!(value);
            ApiResponse::new(StatusCode::OK, r#"{"success":true}"#)
        }
        ("DELETE", "") => {
            state.clients.remove(index);
            ApiResponse::new(StatusCode::OK, r#"{"success":true}"#)
        }
        _ => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}
