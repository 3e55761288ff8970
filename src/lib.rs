//! pokemon-tcg-mcp: Pokémon TCG reference data for LLM clients
//!
//! This library provides the two halves of the system:
//!
//! - **Data gateway**: an HTTP service that wraps the public Pokémon TCG API
//!   and answers with uniform `{status, ...}` envelopes
//! - **RPC bridge**: a Content-Length framed JSON-RPC 2.0 server on stdio that
//!   exposes the gateway as a catalog of named tools
//!
//! The bridge holds no data of its own. Every tool call becomes exactly one
//! `GET` against the gateway, and the gateway's JSON body is returned to the
//! client unchanged.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`gateway`]: HTTP gateway in front of the upstream API
//! - [`logging`]: Tracing setup shared by both binaries
//! - [`mcp`]: Framed JSON-RPC bridge

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod mcp;
