//! Error types shared across the crate.

use thiserror::Error;

/// Errors produced by the transport and session layers.
#[derive(Debug, Error)]
pub enum Error {
	/// The debug endpoint is not listening at all.
	#[error("connection refused by automation endpoint at {host}:{port}")]
	ConnectionRefused { host: String, port: u16 },

	/// Any other transport-level failure (I/O, handshake, bad payloads).
	#[error("transport error: {0}")]
	Transport(String),

	/// The endpoint answered a call with a protocol-level error.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// The evaluated expression threw in the remote execution context.
	#[error("evaluation failed: {0}")]
	Eval(String),

	/// No debuggable page target was advertised by the endpoint.
	#[error("no page target exposes a debugger url")]
	NoTarget,

	/// The connection dropped before a response arrived.
	#[error("connection closed before a response arrived")]
	ChannelClosed,

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// `true` for the endpoint-not-listening case, which carries its own
	/// remediation hint when logged.
	pub fn is_connection_refused(&self) -> bool {
		matches!(self, Error::ConnectionRefused { .. })
	}
}
