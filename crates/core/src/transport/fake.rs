//! In-memory automation endpoint for exercising the session stack without a
//! live player.
//!
//! [`FakeEndpoint::pair`] returns a connector to wire into the lifecycle and
//! a handle for the test: script connect failures, queue evaluation replies,
//! inspect every expression that was evaluated, and trip the disconnect
//! signal of the current session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use super::{AutomationSession, BoxFuture, Connector};
use crate::error::{Error, Result};

#[derive(Default)]
struct Shared {
	refuse_all: AtomicBool,
	connect_failures: AtomicU32,
	connect_attempts: AtomicU32,
	evaluated: Mutex<Vec<String>>,
	replies: Mutex<VecDeque<Result<Value>>>,
	current: Mutex<Option<watch::Sender<bool>>>,
}

/// Test-side handle to the fake endpoint.
pub struct FakeEndpoint {
	shared: Arc<Shared>,
}

impl FakeEndpoint {
	/// Creates a connector plus the handle controlling it.
	pub fn pair() -> (Arc<FakeConnector>, FakeEndpoint) {
		let shared = Arc::new(Shared::default());
		(Arc::new(FakeConnector { shared: Arc::clone(&shared) }), FakeEndpoint { shared })
	}

	/// Refuse every connect until turned off again.
	pub fn refuse_connections(&self, refuse: bool) {
		self.shared.refuse_all.store(refuse, Ordering::SeqCst);
	}

	/// Refuse only the next `count` connects.
	pub fn fail_next_connects(&self, count: u32) {
		self.shared.connect_failures.store(count, Ordering::SeqCst);
	}

	/// Total connect attempts observed, successful or not.
	pub fn connect_attempts(&self) -> u32 {
		self.shared.connect_attempts.load(Ordering::SeqCst)
	}

	/// Queues the reply for the next evaluation; unqueued evaluations
	/// answer `null`.
	pub fn enqueue_reply(&self, reply: Result<Value>) {
		self.shared.replies.lock().push_back(reply);
	}

	pub fn enqueue_value(&self, value: Value) {
		self.enqueue_reply(Ok(value));
	}

	/// Every expression evaluated so far, oldest first.
	pub fn evaluated(&self) -> Vec<String> {
		self.shared.evaluated.lock().clone()
	}

	/// Drops the current session the way a dying player would.
	pub fn trip_disconnect(&self) {
		if let Some(closed_tx) = self.shared.current.lock().take() {
			let _ = closed_tx.send(true);
		}
	}
}

/// Connector half handed to the session lifecycle.
pub struct FakeConnector {
	shared: Arc<Shared>,
}

impl Connector for FakeConnector {
	fn connect(&self, host: &str, port: u16) -> BoxFuture<'_, Result<Arc<dyn AutomationSession>>> {
		let host = host.to_string();
		Box::pin(async move {
			self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);

			let scripted_failure = self
				.shared
				.connect_failures
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
				.is_ok();
			if scripted_failure || self.shared.refuse_all.load(Ordering::SeqCst) {
				return Err(Error::ConnectionRefused { host, port });
			}

			let (closed_tx, closed_rx) = watch::channel(false);
			*self.shared.current.lock() = Some(closed_tx);

			Ok(Arc::new(FakeSession { shared: Arc::clone(&self.shared), closed_rx })
				as Arc<dyn AutomationSession>)
		})
	}
}

struct FakeSession {
	shared: Arc<Shared>,
	closed_rx: watch::Receiver<bool>,
}

impl AutomationSession for FakeSession {
	fn evaluate(&self, expression: String) -> BoxFuture<'_, Result<Value>> {
		Box::pin(async move {
			self.shared.evaluated.lock().push(expression);
			self.shared.replies.lock().pop_front().unwrap_or(Ok(Value::Null))
		})
	}

	fn closed(&self) -> BoxFuture<'static, ()> {
		let mut closed_rx = self.closed_rx.clone();
		Box::pin(async move {
			let _ = closed_rx.wait_for(|closed| *closed).await;
		})
	}

	fn close(&self) {}
}
