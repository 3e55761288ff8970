//! Read/dispatch/write loop of the bridge.
//!
//! One message is read, fully handled and answered before the next read.
//! The loop moves between three states:
//!
//! 1. **Awaiting message**: blocked on a framed read
//! 2. **Dispatching**: handling one decoded message
//! 3. **Terminated**: the loop has exited and the stream is no longer touched
//!
//! Recoverable framing and JSON errors are answered with a parse-error
//! response and the loop keeps going. End-of-stream, a truncated frame or a
//! broken transport end the loop. `shutdown` is answered and then ends the
//! loop; `exit` ends it without a response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{ToolDefinition, ToolRunner, TOOLS};
use crate::mcp::transport::{FrameError, FramedTransport};

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for the next framed message.
    AwaitingMessage,
    /// Handling a message.
    Dispatching,
    /// The loop has exited.
    Terminated,
}

/// What the loop does after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Terminate,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. Always `false`.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// The bridge server.
pub struct McpServer<R, W> {
    state: ServerState,
    transport: FramedTransport<R, W>,
    tools: ToolRunner,
}

impl McpServer<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server speaking over stdin/stdout.
    #[must_use]
    pub fn stdio(tools: ToolRunner) -> Self {
        Self::new(FramedTransport::stdio(), tools)
    }

    /// Runs the loop until it terminates or a shutdown signal arrives.
    ///
    /// Signals are only observed while waiting for a message; an in-flight
    /// gateway call always completes first.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn run(&mut self) -> Result<(), FrameError> {
        self.run_with_shutdown().await
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> Result<(), FrameError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        while self.state != ServerState::Terminated {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    self.state = ServerState::Terminated;
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    self.state = ServerState::Terminated;
                }

                read = self.transport.read_message() => {
                    self.process(read).await?;
                }
            }
        }
        Ok(())
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> Result<(), FrameError> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        while self.state != ServerState::Terminated {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down");
                    self.state = ServerState::Terminated;
                }

                read = self.transport.read_message() => {
                    self.process(read).await?;
                }
            }
        }
        Ok(())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    pub const fn new(transport: FramedTransport<R, W>, tools: ToolRunner) -> Self {
        Self {
            state: ServerState::AwaitingMessage,
            transport,
            tools,
        }
    }

    /// Returns the current server state.
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> FramedTransport<R, W> {
        self.transport
    }

    /// Runs the loop until it terminates.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn serve(&mut self) -> Result<(), FrameError> {
        while self.state != ServerState::Terminated {
            let read = self.transport.read_message().await;
            self.process(read).await?;
        }
        Ok(())
    }

    /// Handles the outcome of one framed read and updates the state.
    async fn process(
        &mut self,
        read: Result<Option<Value>, FrameError>,
    ) -> Result<(), FrameError> {
        self.state = ServerState::Dispatching;
        let flow = self.handle_read(read).await;

        self.state = match flow {
            Ok(Flow::Continue) => ServerState::AwaitingMessage,
            Ok(Flow::Terminate) | Err(_) => ServerState::Terminated,
        };
        flow.map(|_| ())
    }

    async fn handle_read(
        &mut self,
        read: Result<Option<Value>, FrameError>,
    ) -> Result<Flow, FrameError> {
        match read {
            Ok(Some(value)) => match parse_message(value) {
                Ok(msg) => self.handle_message(msg).await,
                Err(response) => {
                    warn!(id = ?response.id, "Rejected invalid request");
                    self.respond(response).await
                }
            },
            Ok(None) => {
                info!("Client closed the stream");
                Ok(Flow::Terminate)
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Could not decode message");
                self.respond(JsonRpcResponse::parse_error(e.to_string()))
                    .await
            }
            Err(FrameError::Io(e)) => {
                error!(error = %e, "Transport failed");
                Err(FrameError::Io(e))
            }
            Err(e) => {
                warn!(error = %e, "Unrecoverable framing error, closing session");
                Ok(Flow::Terminate)
            }
        }
    }

    async fn handle_message(&mut self, msg: IncomingMessage) -> Result<Flow, FrameError> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(notif) => Ok(Self::handle_notification(&notif)),
        }
    }

    fn handle_notification(notif: &JsonRpcNotification) -> Flow {
        if notif.method == "exit" {
            info!("Received exit notification");
            return Flow::Terminate;
        }
        debug!(method = %notif.method, "Ignoring notification");
        Flow::Continue
    }

    async fn handle_request(&mut self, req: JsonRpcRequest) -> Result<Flow, FrameError> {
        info!(id = %req.id, method = %req.method, "Handling request");

        let method = req.method.clone();
        let response = match method.as_str() {
            "initialize" => Self::handle_initialize(&req),
            "shutdown" => {
                info!("Shutdown requested");
                self.respond(JsonRpcResponse::success(req.id, Value::Null))
                    .await?;
                return Ok(Flow::Terminate);
            }
            "exit" => {
                info!("Exit requested");
                return Ok(Flow::Terminate);
            }
            "ping" => JsonRpcResponse::success(req.id, json!({})),
            "tools/list" => Self::handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req).await,
            method => match self.tools.call(method, req.params.as_ref()).await {
                Ok(result) => JsonRpcResponse::success(req.id, result),
                Err(e) => {
                    warn!(id = %req.id, tool = %method, error = %e, "Tool call failed");
                    JsonRpcResponse::error(Some(req.id), e.to_error_object())
                }
            },
        };

        self.respond(response).await
    }

    fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = req
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                client_version = ?client.version,
                requested_version = ?params.protocol_version,
                "Client connected"
            );
        }

        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        )
    }

    fn handle_tools_list(id: RequestId) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = TOOLS.iter().map(|tool| tool.definition()).collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let params: ToolCallParams = match req.params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return JsonRpcResponse::invalid_params(req.id, "Missing tool call params"),
            Err(e) => {
                return JsonRpcResponse::invalid_params(
                    req.id,
                    format!("Invalid tool call params: {e}"),
                )
            }
        };

        let result = match self
            .tools
            .call(&params.name, params.arguments.as_ref())
            .await
        {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text),
                Err(e) => ToolCallResult::error(format!("Failed to render result: {e}")),
            },
            Err(e) => {
                warn!(id = %req.id, tool = %params.name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(req.id, value),
            Err(e) => {
                error!(error = %e, "Failed to serialise tool call result");
                JsonRpcResponse::internal_error(
                    Some(req.id),
                    "Internal error: failed to serialise result",
                )
            }
        }
    }

    /// Writes a response.
    ///
    /// If the response cannot be encoded, a best-effort internal error with
    /// the same id is written instead and the loop terminates.
    async fn respond(&mut self, response: JsonRpcResponse) -> Result<Flow, FrameError> {
        match self.transport.write_message(&response).await {
            Ok(()) => Ok(Flow::Continue),
            Err(FrameError::Encode(e)) => {
                error!(id = ?response.id, error = %e, "Failed to encode response");
                let fallback = JsonRpcResponse::internal_error(
                    response.id,
                    "Internal error: failed to encode response",
                );
                self.transport.write_message(&fallback).await?;
                Ok(Flow::Terminate)
            }
            Err(e) => Err(e),
        }
    }
}
