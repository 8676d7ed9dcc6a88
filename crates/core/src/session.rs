//! Connection lifecycle for the automation endpoint.
//!
//! At most one session exists at a time. Callers never hold the transport:
//! they ask for a session and either get the live one, trigger a single
//! fresh connect, or get `None`. Reconnection after failures and disconnects
//! is scheduled here and nowhere else.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::transport::{AutomationSession, Connector};

/// Connectivity of the automation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
}

/// Snapshot of lifecycle state for status surfaces.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStatus {
	pub state: ConnectionState,
	/// Reconnect attempts consumed since the last successful connect.
	pub attempts: u32,
	/// The reconnect loop has parked itself; only a fresh external
	/// `session()` call will try again.
	pub exhausted: bool,
}

struct StateInner {
	state: ConnectionState,
	session: Option<Arc<dyn AutomationSession>>,
	attempts: u32,
	exhausted: bool,
	/// Bumped on every successful connect so a stale disconnect watcher
	/// cannot clear a newer session.
	epoch: u64,
}

struct Inner {
	connector: Arc<dyn Connector>,
	config: ControllerConfig,
	state: Mutex<StateInner>,
	/// Serializes connect attempts; concurrent callers piggyback on the
	/// attempt in flight instead of dialing twice.
	connect_gate: tokio::sync::Mutex<()>,
}

/// Cloneable handle to the one-session lifecycle.
#[derive(Clone)]
pub struct SessionLifecycle {
	inner: Arc<Inner>,
}

impl SessionLifecycle {
	pub fn new(config: ControllerConfig, connector: Arc<dyn Connector>) -> Self {
		Self {
			inner: Arc::new(Inner {
				connector,
				config,
				state: Mutex::new(StateInner {
					state: ConnectionState::Disconnected,
					session: None,
					attempts: 0,
					exhausted: false,
					epoch: 0,
				}),
				connect_gate: tokio::sync::Mutex::new(()),
			}),
		}
	}

	pub fn config(&self) -> &ControllerConfig {
		&self.inner.config
	}

	pub fn state(&self) -> ConnectionState {
		self.inner.state.lock().state
	}

	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	pub fn reconnect_exhausted(&self) -> bool {
		self.inner.state.lock().exhausted
	}

	pub fn status(&self) -> SessionStatus {
		let state = self.inner.state.lock();
		SessionStatus { state: state.state, attempts: state.attempts, exhausted: state.exhausted }
	}

	/// Performs one connection attempt.
	///
	/// On success the attempt counter resets and a disconnect watcher is
	/// registered; on failure the failure is logged (with a remediation hint
	/// when the endpoint refused outright) and, when auto-connect is on, a
	/// reconnect is scheduled. Does not retry by itself.
	pub async fn connect(&self) -> bool {
		let _gate = self.inner.connect_gate.lock().await;

		// A concurrent caller may have finished connecting while this one
		// waited on the gate.
		if self.is_connected() {
			return true;
		}

		let host = self.inner.config.endpoint_host.clone();
		let port = self.inner.config.endpoint_port;

		self.inner.state.lock().state = ConnectionState::Connecting;
		debug!(target = "tl.session", %host, port, "connecting to automation endpoint");

		match self.inner.connector.connect(&host, port).await {
			Ok(session) => {
				let epoch = {
					let mut state = self.inner.state.lock();
					state.epoch += 1;
					state.session = Some(Arc::clone(&session));
					state.state = ConnectionState::Connected;
					state.attempts = 0;
					state.exhausted = false;
					state.epoch
				};
				info!(target = "tl.session", %host, port, "connected to automation endpoint");
				self.spawn_disconnect_watch(epoch, &session);
				true
			}
			Err(err) => {
				{
					let mut state = self.inner.state.lock();
					state.session = None;
					state.state = ConnectionState::Disconnected;
				}
				if err.is_connection_refused() {
					warn!(
						target = "tl.session",
						%host,
						port,
						"automation endpoint refused the connection; launch the player with \
						 --remote-debugging-port={port} --remote-debugging-address=0.0.0.0"
					);
				} else {
					warn!(target = "tl.session", error = %err, "connection attempt failed");
				}
				if self.inner.config.auto_connect {
					self.auto_reconnect();
				}
				false
			}
		}
	}

	/// Schedules the next reconnect attempt, or parks the loop once the
	/// attempt budget is spent. Parked means parked: only a new `session()`
	/// call dials again, and nothing resets the counter short of a
	/// successful connect.
	pub fn auto_reconnect(&self) {
		let (attempt, delay) = {
			let mut state = self.inner.state.lock();
			if state.attempts >= self.inner.config.max_reconnect_attempts {
				if !state.exhausted {
					state.exhausted = true;
					warn!(
						target = "tl.session",
						attempts = state.attempts,
						"reconnect attempts exhausted; waiting for an external trigger"
					);
				}
				return;
			}
			state.attempts += 1;
			(state.attempts, self.inner.config.reconnect_base_delay * state.attempts)
		};

		info!(
			target = "tl.session",
			attempt,
			max = self.inner.config.max_reconnect_attempts,
			delay_ms = delay.as_millis() as u64,
			"scheduling reconnect"
		);

		let lifecycle = self.clone();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			lifecycle.connect().await;
		});
	}

	/// Returns the live session, or the result of one fresh connect.
	///
	/// Callers must tolerate `None` and must not retry on their own; retry
	/// policy lives entirely in this type.
	pub async fn session(&self) -> Option<Arc<dyn AutomationSession>> {
		if let Some(session) = self.current_session() {
			return Some(session);
		}
		if self.connect().await { self.current_session() } else { None }
	}

	/// Closes the current session, if any, without scheduling a reconnect
	/// beyond what the disconnect watcher does.
	pub fn shutdown(&self) {
		let session = self.inner.state.lock().session.clone();
		if let Some(session) = session {
			session.close();
		}
	}

	fn current_session(&self) -> Option<Arc<dyn AutomationSession>> {
		let state = self.inner.state.lock();
		if state.state == ConnectionState::Connected { state.session.clone() } else { None }
	}

	fn spawn_disconnect_watch(&self, epoch: u64, session: &Arc<dyn AutomationSession>) {
		let closed = session.closed();
		let lifecycle = self.clone();
		tokio::spawn(async move {
			closed.await;

			let cleared = {
				let mut state = lifecycle.inner.state.lock();
				if state.epoch != epoch || state.state != ConnectionState::Connected {
					false
				} else {
					state.session = None;
					state.state = ConnectionState::Disconnected;
					state.attempts = 0;
					true
				}
			};

			if cleared {
				warn!(target = "tl.session", "automation endpoint disconnected");
				if lifecycle.inner.config.auto_connect {
					lifecycle.auto_reconnect();
				}
			}
		});
	}
}

impl std::fmt::Debug for SessionLifecycle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let status = self.status();
		f.debug_struct("SessionLifecycle")
			.field("state", &status.state)
			.field("attempts", &status.attempts)
			.field("exhausted", &status.exhausted)
			.finish()
	}
}
