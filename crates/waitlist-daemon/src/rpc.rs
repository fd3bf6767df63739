//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};
use waitlist_core::WaitlistError;

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Stable error name.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Waitlist errors

    /// Transient failure; the same request may succeed (-32001).
    pub fn try_again(detail: &str) -> Self {
        Self {
            code: -32001,
            message: "TRY_AGAIN".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Unknown entrant, code or subscription (-32002).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32002,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Domain rule rejected the request; retrying will not help (-32003).
    pub fn validation_failed(reason: &str, detail: &str) -> Self {
        Self {
            code: -32003,
            message: "VALIDATION_FAILED".to_string(),
            data: Some(serde_json::json!({"reason": reason, "detail": detail})),
        }
    }
}

impl From<WaitlistError> for RpcError {
    fn from(err: WaitlistError) -> Self {
        let detail = err.to_string();
        match err {
            WaitlistError::InvalidEmail | WaitlistError::InvalidPlatform(_) => {
                Self::invalid_params(&detail)
            }
            WaitlistError::SelfReferral => Self::validation_failed("self_referral", &detail),
            WaitlistError::AlreadyOnWaitlist => {
                Self::validation_failed("already_on_waitlist", &detail)
            }
            WaitlistError::InvalidTransition { .. } => {
                Self::validation_failed("invalid_transition", &detail)
            }
            WaitlistError::UnknownReferralCode(_) | WaitlistError::EntrantNotFound(_) => {
                Self::not_found(&detail)
            }
            ref other if other.is_retryable() => {
                warn!(error = %detail, "retryable failure returned to client");
                Self::try_again(&detail)
            }
            _ => {
                error!(error = %detail, "request failed");
                Self::internal_error(&detail)
            }
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&state, &line).await;

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Parse and dispatch one request line.
pub async fn handle_line(state: &Arc<DaemonState>, line: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) if request.jsonrpc != "2.0" => {
            RpcResponse::error(request.id, RpcError::invalid_request())
        }
        Ok(request) => dispatch_request(state, request).await,
        Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: &Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Admission
        "signup" => commands::admission::signup(state, params).await,
        "tier_quote" => commands::admission::tier_quote(state, params).await,
        "counter_snapshot" => commands::admission::counter_snapshot(state).await,

        // Referrals
        "record_referral" => commands::referrals::record_referral(state, params).await,
        "record_referral_click" => {
            commands::referrals::record_referral_click(state, params).await
        }
        "verify_referral" => commands::referrals::verify_referral(state, params).await,
        "complete_batch" => commands::referrals::complete_batch(state, params).await,

        // Shares
        "record_share" => commands::shares::record_share(state, params).await,
        "verify_share" => commands::shares::verify_share(state, params).await,

        // Entrants
        "recompute" => commands::entrants::recompute(state, params).await,
        "entrant_status" => commands::entrants::entrant_status(state, params).await,
        "activate" => commands::entrants::activate(state, params).await,
        "suspend" => commands::entrants::suspend(state, params).await,
        "list_queue" => commands::entrants::list_queue(state, params).await,

        // Events & diagnostics
        "subscribe_events" => commands::diagnostics::subscribe_events(state, params).await,
        "poll_events" => commands::diagnostics::poll_events(state, params).await,
        "unsubscribe_events" => commands::diagnostics::unsubscribe_events(state, params).await,
        "daemon_status" => commands::diagnostics::daemon_status(state).await,
        "shutdown" => commands::diagnostics::shutdown(state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
