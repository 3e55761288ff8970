//! The RPC bridge: framed JSON-RPC over stdio, forwarded to the data gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Bridge                              │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│    Tools     │     │
//! │   │  (framing)  │    │ (dispatch)  │    │ (resolution) │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! │                                                │             │
//! │                                                ▼             │
//! │                                        ┌──────────────┐      │
//! │                                        │   Upstream   │──────┼──▶ gateway
//! │                                        │  (HTTP GET)  │      │
//! │                                        └──────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! `initialize` advertises MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;
pub mod upstream;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerState};
pub use tools::{ToolError, ToolRunner, TOOLS};
pub use transport::{FrameError, FramedTransport, StdioTransport};
pub use upstream::{GatewayClient, UpstreamError};
