//! Remote tool protocol
//!
//! Client side of the Model Context Protocol over streamable HTTP:
//! handshake, tool discovery and correlated tool invocation against
//! independent tool servers.

pub mod client;
pub mod error;
pub mod messages;
pub mod transport;

pub use client::{ConnectionState, DEFAULT_MAX_CONSECUTIVE_FAILURES, ProtocolClient};
pub use error::ProtocolError;
pub use transport::{HttpTransport, Transport, TransportReply};
