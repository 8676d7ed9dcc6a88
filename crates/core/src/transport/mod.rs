//! Automation transport boundary.
//!
//! Everything above this module treats the player's debug protocol as a
//! black box: connect to an endpoint, evaluate an expression in the page,
//! observe the connection dropping. [`cdp`] is the live implementation over
//! the DevTools protocol; [`fake`] is an in-memory stand-in for tests.

pub mod cdp;
pub mod fake;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A live attachment to the player page.
///
/// Handed out behind `Arc` by the session lifecycle; callers never hold the
/// underlying socket.
pub trait AutomationSession: Send + Sync {
	/// Evaluates an expression in the page, asking the remote side to await
	/// async results and return a plain value rather than a live reference.
	fn evaluate(&self, expression: String) -> BoxFuture<'_, Result<Value>>;

	/// Resolves once the underlying transport has dropped. Used by the
	/// lifecycle's disconnect watcher; safe to call more than once.
	fn closed(&self) -> BoxFuture<'static, ()>;

	/// Asks the transport to shut down. Idempotent.
	fn close(&self);
}

/// Dials the automation endpoint and produces sessions.
pub trait Connector: Send + Sync {
	fn connect(&self, host: &str, port: u16) -> BoxFuture<'_, Result<Arc<dyn AutomationSession>>>;
}
